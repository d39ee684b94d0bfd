//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Servidor de un solo hilo que:
//! 1. Escucha en un puerto
//! 2. Vigila el socket de escucha y las conexiones abiertas con `mio`
//! 3. Lee y parsea un request por conexión
//! 4. Resuelve el request con la cadena de handlers y envía la respuesta
//! 5. Escribe una línea de access log y cierra la conexión

pub mod access_log;
pub mod dispatch;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use access_log::AccessLog;
pub use dispatch::{Dispatch, Dispatcher, Stream};
pub use tcp::{BoundServer, Server, ServerError};
