//! # Access Log
//! src/server/access_log.rs
//!
//! Una línea por intento de request, por defecto en stdout:
//!
//! ```text
//! Sat Oct 17 10:04:12 2026 127.0.0.1 GET /static/a.png 200
//! Sat Oct 17 10:04:13 2026 127.0.0.1 400
//! ```
//!
//! Los requests que no se pudieron parsear (400) no tienen método ni path.

use std::io::{self, Write};
use std::net::IpAddr;

use chrono::Local;

use crate::http::{Method, StatusCode};

/// Sink de líneas de access log
pub struct AccessLog {
    writer: Box<dyn Write + Send>,
}

impl AccessLog {
    /// Access log hacia un writer arbitrario
    pub fn new<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            writer: Box::new(writer),
        }
    }

    /// Access log hacia stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Registra un request que no se pudo parsear
    pub fn bad_request(&mut self, client: IpAddr) -> io::Result<()> {
        let line = format_bad_request(&timestamp(), client);
        self.write_line(&line)
    }

    /// Registra un request parseado con el status enviado
    pub fn request(
        &mut self,
        client: IpAddr,
        method: Method,
        path: &str,
        status: u16,
    ) -> io::Result<()> {
        let line = format_request(&timestamp(), client, method, path, status);
        self.write_line(&line)
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()
    }
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::stdout()
    }
}

/// Timestamp estilo `ctime` en hora local (ej: "Sat Oct 17 10:04:12 2026")
pub fn timestamp() -> String {
    Local::now().format("%c").to_string()
}

pub fn format_bad_request(timestamp: &str, client: IpAddr) -> String {
    format!("{} {} {}", timestamp, client, StatusCode::BadRequest.as_u16())
}

pub fn format_request(
    timestamp: &str,
    client: IpAddr,
    method: Method,
    path: &str,
    status: u16,
) -> String {
    format!("{} {} {} {} {}", timestamp, client, method, path, status)
}
