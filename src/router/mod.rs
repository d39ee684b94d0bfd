//! # Cadena de Handlers
//! src/router/mod.rs
//!
//! El router es una cadena ordenada de handlers. Cada request recorre la
//! cadena y el primer handler que la atiende gana:
//!
//! ```text
//! Request → [H1] → [H2] → [H3] → Unhandled (404)
//!             │      │
//!          Declined  Handled(Response) → se corta la cadena
//! ```
//!
//! ## Orden de resolución
//!
//! `register` inserta al frente de la lista en O(1), así que antes de
//! `seal` la cadena se recorre en orden inverso al registro. `seal` invierte
//! la lista una sola vez y desde ahí el orden de resolución es el orden de
//! registro. El servidor sella su router al hacer `bind`.

use std::io;
use std::ops::ControlFlow;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{event, Level};

use crate::http::{Request, Response};
use crate::list::List;

/// Resultado de un handler para un request
#[derive(Debug)]
pub enum Outcome {
    /// El handler atiende el request; se corta la cadena
    Handled(Response),

    /// No es una ruta de este handler; probar el siguiente
    Declined,

    /// El handler reconoció la ruta pero falló internamente
    Failed(HandlerError),
}

/// Fallas internas de un handler
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Internal(String),
}

/// Un handler toma un request parseado y decide si lo atiende
///
/// Cualquier closure `Fn(&Request) -> Outcome` es un handler:
///
/// ```
/// use minihttpd::http::Response;
/// use minihttpd::router::{Outcome, Router};
///
/// let mut router = Router::new();
/// router.register(|req: &minihttpd::http::Request| {
///     if req.path() == "/hello" {
///         Outcome::Handled(Response::text("hello"))
///     } else {
///         Outcome::Declined
///     }
/// });
/// ```
pub trait Handler: Send {
    fn handle(&self, request: &Request) -> Outcome;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> Outcome + Send,
{
    fn handle(&self, request: &Request) -> Outcome {
        self(request)
    }
}

/// Resultado de recorrer la cadena completa
#[derive(Debug)]
pub enum Resolution {
    /// Algún handler atendió el request
    Handled(Response),

    /// Ningún handler lo atendió. `failures` guarda las fallas internas de
    /// los handlers que reconocieron la ruta pero no pudieron responder.
    Unhandled { failures: Vec<HandlerError> },
}

impl Resolution {
    pub fn is_handled(&self) -> bool {
        matches!(self, Resolution::Handled(_))
    }
}

/// Cadena ordenada de handlers
pub struct Router {
    handlers: List<Box<dyn Handler>>,
    sealed: bool,
}

impl Router {
    /// Crea un router vacío
    pub fn new() -> Self {
        Self {
            handlers: List::new(),
            sealed: false,
        }
    }

    /// Registra un handler al frente de la cadena
    ///
    /// Registrar después de `seal` pone al handler primero en la resolución.
    pub fn register<H>(&mut self, handler: H)
    where
        H: Handler + 'static,
    {
        self.handlers.insert_front(Box::new(handler));
    }

    /// Invierte la cadena una vez para que el orden de resolución sea el
    /// orden de registro. Llamarlo de nuevo no cambia nada.
    pub fn seal(&mut self) {
        if self.sealed {
            return;
        }

        self.handlers.reverse();
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Recorre la cadena y retorna la respuesta del primer handler que
    /// atienda el request
    pub fn route(&self, request: &Request) -> Resolution {
        let mut handled = None;
        let mut failures = Vec::new();

        self.handlers.for_each(|handler| match handler.handle(request) {
            Outcome::Handled(response) => {
                handled = Some(response);
                ControlFlow::Break(())
            }
            Outcome::Declined => ControlFlow::Continue(()),
            Outcome::Failed(error) => {
                event!(Level::WARN, path = request.path(), %error, "handler failed");
                failures.push(error);
                ControlFlow::Continue(())
            }
        });

        match handled {
            Some(response) => Resolution::Handled(response),
            None => Resolution::Unhandled { failures },
        }
    }

    /// Número de handlers registrados
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
