//! # minihttpd
//! src/lib.rs
//!
//! Servidor HTTP/1.0 mínimo de un solo hilo. Un event loop basado en
//! readiness atiende muchas conexiones; cada conexión envía un request,
//! recibe una respuesta y se cierra.
//!
//! ## Arquitectura
//!
//! - `list`: lista simplemente enlazada genérica
//! - `http`: parsing de requests y serialización de responses HTTP/1.0
//! - `router`: cadena ordenada de handlers, el primero que acepta gana
//! - `handlers`: handlers incluidos (archivos estáticos)
//! - `server`: event loop, dispatch por conexión y access log
//! - `config`: configuración por CLI y variables de entorno
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use minihttpd::config::Config;
//! use minihttpd::http::Response;
//! use minihttpd::router::Outcome;
//! use minihttpd::server::Server;
//!
//! let mut server = Server::new(Config::default());
//! server.register(|req: &minihttpd::http::Request| {
//!     if req.path() == "/ping" {
//!         Outcome::Handled(Response::text("pong"))
//!     } else {
//!         Outcome::Declined
//!     }
//! });
//! server.add_static_handler();
//!
//! server.bind().expect("bind").run().expect("event loop");
//! ```

pub mod config;
pub mod handlers;
pub mod http;
pub mod list;
pub mod router;
pub mod server;
