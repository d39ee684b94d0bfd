//! # Tabla de tipos MIME
//! src/http/mime.rs
//!
//! Tabla fija extensión → tipo MIME para los archivos estáticos.

use std::path::Path;

/// Tipo usado cuando la extensión no está en la tabla
pub const DEFAULT_MIME_TYPE: &str = "text/plain";

const MIME_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("json", "application/json"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("gif", "image/gif"),
    ("png", "image/png"),
    ("css", "text/css"),
    ("js", "application/javascript"),
];

/// Infiere el tipo MIME a partir de la última extensión del path
///
/// # Ejemplo
/// ```
/// use minihttpd::http::mime::mime_type;
///
/// assert_eq!(mime_type("static/a.png"), "image/png");
/// assert_eq!(mime_type("static/archive.tar.gz"), "text/plain");
/// ```
pub fn mime_type<P: AsRef<Path>>(path: P) -> &'static str {
    let Some(extension) = path.as_ref().extension().and_then(|ext| ext.to_str()) else {
        return DEFAULT_MIME_TYPE;
    };

    MIME_TYPES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(extension))
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
}
