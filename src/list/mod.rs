//! # Lista Enlazada Genérica
//! src/list/mod.rs
//!
//! Lista simplemente enlazada que es dueña de sus valores. Es la estructura
//! sobre la que se construye la cadena de handlers del router.
//!
//! ## Operaciones
//!
//! - `insert_front` / `cons`: agrega un nodo al inicio en O(1)
//! - `reverse`: invierte la lista en sitio en O(n)
//! - `clear`: libera todos los nodos
//! - `for_each`: recorre de cabeza a cola, con corte temprano
//!
//! ```text
//! head → [c] → [b] → [a] → None
//! ```

use std::fmt;
use std::ops::ControlFlow;

type Link<T> = Option<Box<Cell<T>>>;

struct Cell<T> {
    value: T,
    next: Link<T>,
}

/// Resultado de un recorrido con `for_each`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    /// Se visitaron todos los nodos
    Done,

    /// El visitante pidió detenerse antes del final
    Break,
}

/// Lista simplemente enlazada, dueña de sus valores
pub struct List<T> {
    head: Link<T>,
    len: usize,
}

impl<T> List<T> {
    /// Crea una lista vacía
    pub fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// Construye una lista nueva cuya cabeza es `value` y cuya cola es `list`
    ///
    /// # Ejemplo
    /// ```
    /// use minihttpd::list::List;
    ///
    /// let list = List::cons(2, List::cons(1, List::new()));
    /// assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![2, 1]);
    /// ```
    pub fn cons(value: T, mut list: List<T>) -> Self {
        list.insert_front(value);
        list
    }

    /// Inserta un valor al inicio de la lista. Los nodos existentes no se tocan.
    pub fn insert_front(&mut self, value: T) {
        let next = self.head.take();
        self.head = Some(Box::new(Cell { value, next }));
        self.len += 1;
    }

    /// Invierte la lista en sitio
    ///
    /// Aplicarla dos veces deja la lista en su orden original.
    pub fn reverse(&mut self) {
        let mut prev: Link<T> = None;
        let mut current = self.head.take();

        while let Some(mut cell) = current {
            current = cell.next.take();
            cell.next = prev;
            prev = Some(cell);
        }

        self.head = prev;
    }

    /// Libera todos los nodos de la lista
    pub fn clear(&mut self) {
        // Iterativo: soltar el Box de la cabeza recursivamente podría
        // desbordar el stack con listas largas
        let mut current = self.head.take();
        while let Some(mut cell) = current {
            current = cell.next.take();
        }
        self.len = 0;
    }

    /// Recorre la lista de cabeza a cola
    ///
    /// Se detiene la primera vez que `visitor` retorna `ControlFlow::Break`.
    /// Una lista vacía retorna `Iteration::Done` sin llamar al visitante.
    ///
    /// # Ejemplo
    /// ```
    /// use std::ops::ControlFlow;
    /// use minihttpd::list::{Iteration, List};
    ///
    /// let list: List<u32> = [1, 2, 3].into_iter().collect();
    /// let result = list.for_each(|value| {
    ///     if *value == 2 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
    /// });
    /// assert_eq!(result, Iteration::Break);
    /// ```
    pub fn for_each<F>(&self, mut visitor: F) -> Iteration
    where
        F: FnMut(&T) -> ControlFlow<()>,
    {
        for value in self.iter() {
            if visitor(value).is_break() {
                return Iteration::Break;
            }
        }

        Iteration::Done
    }

    /// Iterador de cabeza a cola
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    /// Primer valor de la lista
    pub fn front(&self) -> Option<&T> {
        self.head.as_ref().map(|cell| &cell.value)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for List<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Construye la lista con inserciones al frente: el último elemento del
/// iterador queda en la cabeza.
impl<T> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = List::new();
        for value in iter {
            list.insert_front(value);
        }
        list
    }
}

impl<T: fmt::Debug> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterador prestado sobre una `List`
pub struct Iter<'a, T> {
    next: Option<&'a Cell<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.next.map(|cell| {
            self.next = cell.next.as_deref();
            &cell.value
        })
    }
}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
