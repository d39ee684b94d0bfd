//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Implementa lo necesario del protocolo HTTP/1.0 sin librerías de alto nivel:
//!
//! - Parsing de requests HTTP/1.0
//! - Construcción y escritura de responses
//! - Status codes
//! - Tabla de tipos MIME para archivos estáticos
//!
//! ## Especificación HTTP/1.0
//!
//! El servidor responde una sola petición por conexión y cierra:
//! - No hay conexiones persistentes
//! - No hay chunked transfer encoding
//! - No hay pipelining
//!
//! ### Formato de Request
//!
//! ```text
//! GET /path?query=value HTTP/1.0\r\n
//! Header-Name: Header-Value\r\n
//! \r\n
//! ```

pub mod mime;
pub mod request;
pub mod response;
pub mod status;

// Re-exportamos los tipos principales para poder usar `http::Request`
pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
