//! # Archivos Estáticos
//! src/handlers/static_files.rs
//!
//! Handler que sirve archivos desde un directorio raíz para los paths que
//! empiezan con un prefijo fijo (por defecto `/static/`).
//!
//! ```text
//! GET /static/css/site.css  →  <root>/static/css/site.css
//! ```
//!
//! Declina (no falla) cuando:
//! - el path no empieza con el prefijo
//! - la URI contiene `../`
//! - el archivo no existe o es un directorio
//!
//! La lectura es síncrona y del archivo completo.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::{event, Level};

use crate::http::mime::mime_type;
use crate::http::{Request, Response, StatusCode};
use crate::router::{Handler, HandlerError, Outcome};

/// Prefijo por defecto de las rutas estáticas
pub const DEFAULT_PREFIX: &str = "/static/";

/// Valor de `Cache-Control` de los archivos servidos (30 días)
pub const CACHE_CONTROL: &str = "max-age=2592000";

/// Handler de archivos estáticos
#[derive(Debug, Clone)]
pub struct StaticFiles {
    prefix: String,
    root: PathBuf,
}

impl StaticFiles {
    /// Crea el handler con un prefijo de URL y un directorio raíz
    pub fn new(prefix: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            root: root.into(),
        }
    }

    /// Handler con el prefijo `/static/` y el directorio de trabajo como raíz
    pub fn in_working_dir() -> Self {
        Self::new(DEFAULT_PREFIX, ".")
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Traduce el path normalizado a un archivo bajo la raíz.
    ///
    /// Retorna `None` si el path intenta salir de la raíz.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));

        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }

        Some(self.root.join(relative))
    }
}

impl Default for StaticFiles {
    fn default() -> Self {
        Self::in_working_dir()
    }
}

impl Handler for StaticFiles {
    fn handle(&self, request: &Request) -> Outcome {
        if !request.path().starts_with(&self.prefix) {
            return Outcome::Declined;
        }

        if request.uri().contains("../") {
            event!(Level::DEBUG, uri = request.uri(), "rejecting path traversal");
            return Outcome::Declined;
        }

        let Some(file_path) = self.resolve(request.path()) else {
            event!(Level::DEBUG, path = request.path(), "rejecting path traversal");
            return Outcome::Declined;
        };

        match fs::metadata(&file_path) {
            Ok(metadata) if metadata.is_dir() => return Outcome::Declined,
            Ok(_) => {}
            Err(error) if error.kind() == ErrorKind::NotFound => return Outcome::Declined,
            Err(source) => {
                return Outcome::Failed(HandlerError::Io {
                    path: file_path,
                    source,
                })
            }
        }

        let body = match fs::read(&file_path) {
            Ok(body) => body,
            Err(error) if error.kind() == ErrorKind::NotFound => return Outcome::Declined,
            Err(source) => {
                return Outcome::Failed(HandlerError::Io {
                    path: file_path,
                    source,
                })
            }
        };

        let response = Response::new(StatusCode::Ok)
            .with_header("Content-Type", mime_type(&file_path))
            .with_body_bytes(body)
            .with_header("Cache-Control", CACHE_CONTROL);

        Outcome::Handled(response)
    }
}
