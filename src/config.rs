//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor con soporte para argumentos CLI y variables
//! de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./minihttpd --port 8080 \
//!   --backlog 16 \
//!   --buffer-size 20480 \
//!   --static-root /srv/www
//! ```
//!
//! El path completo de la URL se resuelve bajo la raíz: `/static/a.png`
//! se sirve desde `/srv/www/static/a.png`.
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 RUST_LOG=debug ./minihttpd
//! ```

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;
use tracing::{event, Level};

/// Configuración del servidor HTTP/1.0
#[derive(Debug, Clone, Parser)]
#[command(name = "minihttpd")]
#[command(about = "Servidor HTTP/1.0 mínimo de un solo hilo con cadena de handlers")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha (por defecto todas las interfaces)
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    // === Capacidad ===
    /// Largo de la cola de conexiones pendientes del socket
    #[arg(long, default_value = "1", env = "HTTP_BACKLOG")]
    pub backlog: i32,

    /// Tamaño del buffer de lectura; los requests más largos se truncan
    #[arg(long = "buffer-size", default_value = "20480", env = "HTTP_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Máximo de conexiones abiertas a la vez
    #[arg(long = "max-connections", default_value = "1024", env = "HTTP_MAX_CONNECTIONS")]
    pub max_connections: usize,

    // === Archivos estáticos ===
    /// Prefijo de URL de los archivos estáticos
    #[arg(long = "static-prefix", default_value = "/static/", env = "STATIC_PREFIX")]
    pub static_prefix: String,

    /// Directorio raíz de los archivos estáticos (`/static/x` → `<root>/static/x`)
    #[arg(long = "static-root", default_value = ".", env = "STATIC_ROOT")]
    pub static_root: PathBuf,

    /// No registrar el handler de archivos estáticos
    #[arg(long = "no-static", env = "NO_STATIC")]
    pub no_static: bool,

    // === Logging ===
    /// Filtro de logs de diagnóstico (sintaxis de `RUST_LOG`)
    #[arg(long = "log-filter", default_value = "info", env = "RUST_LOG")]
    pub log_filter: String,
}

/// Errores de configuración
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("backlog must be >= 1")]
    Backlog,

    #[error("buffer size must be >= 1")]
    BufferSize,

    #[error("max connections must be >= 1")]
    MaxConnections,

    #[error("static prefix must start and end with '/': {0}")]
    StaticPrefix(String),

    #[error("cannot resolve listen address {0}")]
    Address(String),
}

impl Config {
    /// Crea una configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use minihttpd::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resuelve `host:port` a una dirección de socket
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ConfigError::Address(self.address()))
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backlog < 1 {
            return Err(ConfigError::Backlog);
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::BufferSize);
        }
        if self.max_connections == 0 {
            return Err(ConfigError::MaxConnections);
        }

        let prefix = &self.static_prefix;
        if !prefix.starts_with('/') || !prefix.ends_with('/') {
            return Err(ConfigError::StaticPrefix(prefix.clone()));
        }

        Ok(())
    }

    /// Registra un resumen de la configuración en los logs
    pub fn log_summary(&self) {
        event!(
            Level::INFO,
            address = %self.address(),
            backlog = self.backlog,
            buffer_size = self.buffer_size,
            max_connections = self.max_connections,
            "network"
        );

        if self.no_static {
            event!(Level::INFO, "static files disabled");
        } else {
            event!(
                Level::INFO,
                prefix = %self.static_prefix,
                root = %self.static_root.display(),
                "static files"
            );
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            backlog: 1,
            buffer_size: 20480,
            max_connections: 1024,
            static_prefix: "/static/".to_string(),
            static_root: PathBuf::from("."),
            no_static: false,
            log_filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.backlog, 1);
        assert_eq!(config.buffer_size, 20480);
        assert_eq!(config.static_prefix, "/static/");
        assert_eq!(config.static_root, PathBuf::from("."));
        assert!(!config.no_static);
    }

    #[test]
    fn test_address() {
        let config = Config::default();
        assert_eq!(config.address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_address_custom() {
        let mut config = Config::default();
        config.host = "127.0.0.1".to_string();
        config.port = 3000;
        assert_eq!(config.address(), "127.0.0.1:3000");
        assert_eq!(config.socket_addr().unwrap(), "127.0.0.1:3000".parse().unwrap());
    }

    #[test]
    fn test_socket_addr_invalid_host() {
        let mut config = Config::default();
        config.host = "not a host".to_string();
        assert!(matches!(config.socket_addr(), Err(ConfigError::Address(_))));
    }

    #[test]
    fn test_parse_cli_args() {
        let config = Config::try_parse_from([
            "minihttpd",
            "--port",
            "9000",
            "--backlog",
            "32",
            "--buffer-size",
            "4096",
            "--static-root",
            "/srv/www",
            "--no-static",
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.backlog, 32);
        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.static_root, PathBuf::from("/srv/www"));
        assert!(config.no_static);
    }

    // ==================== Validación ====================

    #[test]
    fn test_validate_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_backlog() {
        let mut config = Config::default();
        config.backlog = 0;
        assert_eq!(config.validate(), Err(ConfigError::Backlog));
    }

    #[test]
    fn test_validate_invalid_buffer_size() {
        let mut config = Config::default();
        config.buffer_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::BufferSize));
    }

    #[test]
    fn test_validate_invalid_max_connections() {
        let mut config = Config::default();
        config.max_connections = 0;
        assert_eq!(config.validate(), Err(ConfigError::MaxConnections));
    }

    #[test]
    fn test_validate_invalid_static_prefix() {
        let mut config = Config::default();
        config.static_prefix = "static".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::StaticPrefix(_))));

        config.static_prefix = "/static".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::StaticPrefix(_))));
    }

    #[test]
    fn test_log_summary() {
        // No debe entrar en pánico sin subscriber
        Config::default().log_summary();
    }
}
