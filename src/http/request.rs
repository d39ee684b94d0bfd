//! # Parsing de Requests HTTP/1.0
//! src/http/request.rs
//!
//! Parser HTTP/1.0 escrito a mano. Produce un `Request` con el método, la
//! URI cruda, el path normalizado, los headers y el body; o un `ParseError`.
//!
//! ## Formato de un Request HTTP/1.0
//!
//! ```text
//! GET /static/logo.png?v=2 HTTP/1.0\r\n
//! Host: localhost:8080\r\n
//! User-Agent: curl/7.68.0\r\n
//! \r\n
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD URI VERSION`
//! 2. **Headers**: Pares `Name: Value` (uno por línea)
//! 3. **Empty Line**: `\r\n` que separa headers del body
//! 4. **Body**: lo que sigue a la línea vacía (puede estar truncado)

use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Métodos HTTP reconocidos por el parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    OPTIONS,
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    TRACE,
    CONNECT,
}

impl Method {
    /// Todos los métodos, en el orden del RFC
    pub const ALL: [Method; 8] = [
        Method::OPTIONS,
        Method::GET,
        Method::HEAD,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::TRACE,
        Method::CONNECT,
    ];

    /// Parsea un método HTTP desde su token. Distingue mayúsculas.
    pub fn from_token(token: &str) -> Result<Self, ParseError> {
        Method::ALL
            .iter()
            .copied()
            .find(|method| method.as_str() == token)
            .ok_or_else(|| ParseError::UnsupportedMethod(token.to_string()))
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::OPTIONS => "OPTIONS",
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::TRACE => "TRACE",
            Method::CONNECT => "CONNECT",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Representa un request HTTP/1.0 parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// URI tal como llegó en la request line (ej: "/static/a%20b.txt?v=1")
    uri: String,

    /// Path normalizado: sin query string y con percent-decoding
    /// (ej: "/static/a b.txt")
    path: String,

    query_params: HashMap<String, String>,

    /// Headers en el orden en que llegaron
    headers: Vec<(String, String)>,

    /// Versión HTTP ("HTTP/1.0" o "HTTP/1.1")
    version: String,

    body: Vec<u8>,
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty request")]
    EmptyRequest,

    #[error("Invalid request line format")]
    InvalidRequestLine,

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid request target: {0}")]
    InvalidTarget(String),

    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl Request {
    /// Parsea un request HTTP/1.0 desde bytes
    ///
    /// El buffer puede venir truncado (el dispatcher lee una sola vez con
    /// un buffer de tamaño fijo); basta con que la request line esté completa.
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use minihttpd::http::{Method, Request};
    ///
    /// let raw = b"GET /static/a%20b.txt?v=1 HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.method(), Method::GET);
    /// assert_eq!(request.uri(), "/static/a%20b.txt?v=1");
    /// assert_eq!(request.path(), "/static/a b.txt");
    /// assert_eq!(request.query_param("v"), Some("1"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let (head, body, complete) = split_head(buffer);

        if head.iter().all(u8::is_ascii_whitespace) {
            return Err(ParseError::EmptyRequest);
        }

        let mut lines = split_lines(head);

        // Sin línea vacía el buffer vino truncado y la última línea puede
        // estar cortada a la mitad
        if !complete && lines.len() > 1 {
            lines.pop();
        }

        // 1. Request line
        let request_line =
            std::str::from_utf8(lines[0]).map_err(|_| ParseError::InvalidRequestLine)?;
        let (method, uri, version) = Self::parse_request_line(request_line)?;

        // 2. Path normalizado y query
        let (path, query_params) = Self::parse_target(&uri)?;

        // 3. Headers
        let headers = Self::parse_headers(
            lines[1..]
                .iter()
                .map(|line| String::from_utf8_lossy(line)),
        )?;

        Ok(Request {
            method,
            uri,
            path,
            query_params,
            headers,
            version,
            body: body.to_vec(),
        })
    }

    /// Formato: `GET /path?query HTTP/1.0`
    fn parse_request_line(line: &str) -> Result<(Method, String, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        // Debe tener exactamente 3 partes: METHOD URI VERSION
        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        let method = Method::from_token(parts[0])?;

        let uri = parts[1].to_string();
        if !uri.starts_with('/') && uri != "*" {
            return Err(ParseError::InvalidTarget(uri));
        }

        let version = parts[2].to_string();
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version));
        }

        Ok((method, uri, version))
    }

    /// Separa el path de la query string y decodifica ambos
    ///
    /// Ejemplo: "/a%20b?num=10&fast"
    /// Retorna: ("/a b", {"num": "10", "fast": ""})
    fn parse_target(uri: &str) -> Result<(String, HashMap<String, String>), ParseError> {
        let (raw_path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, query),
            None => (uri, ""),
        };

        let path = percent_decode_str(raw_path)
            .decode_utf8()
            .map_err(|_| ParseError::InvalidTarget(uri.to_string()))?
            .into_owned();

        Ok((path, Self::parse_query_string(query)))
    }

    fn parse_query_string(query: &str) -> HashMap<String, String> {
        let mut params = HashMap::new();

        for param in query.split('&') {
            if param.is_empty() {
                continue;
            }

            // Parámetro sin valor (ej: "?debug") queda con string vacío
            let (key, value) = param.split_once('=').unwrap_or((param, ""));
            params.insert(Self::url_decode(key), Self::url_decode(value));
        }

        params
    }

    /// Decodifica un componente de query ("+" es espacio)
    fn url_decode(s: &str) -> String {
        let s = s.replace('+', " ");
        percent_decode_str(&s).decode_utf8_lossy().into_owned()
    }

    /// Cada header tiene formato: "Name: Value"
    fn parse_headers<I>(lines: I) -> Result<Vec<(String, String)>, ParseError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut headers = Vec::new();

        for line in lines {
            let line = line.as_ref();
            if line.trim().is_empty() {
                break;
            }

            match line.split_once(':') {
                Some((name, value)) if !name.trim().is_empty() => {
                    headers.push((name.trim().to_string(), value.trim().to_string()));
                }
                _ => return Err(ParseError::InvalidHeader(line.to_string())),
            }
        }

        Ok(headers)
    }

    // === Métodos públicos para acceder a los campos ===

    pub fn method(&self) -> Method {
        self.method
    }

    /// URI cruda, tal como llegó
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Path normalizado
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Obtiene un header sin distinguir mayúsculas en el nombre
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Separa el buffer en cabecera y body en el primer `\r\n\r\n`.
/// Sin separador, todo el buffer es cabecera y el `bool` es `false`.
fn split_head(buffer: &[u8]) -> (&[u8], &[u8], bool) {
    match buffer.windows(4).position(|window| window == b"\r\n\r\n") {
        Some(end) => (&buffer[..end], &buffer[end + 4..], true),
        None => (buffer, &[], false),
    }
}

/// Separa el head en líneas terminadas en `\r\n`; siempre hay al menos una
fn split_lines(mut head: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();

    while let Some(end) = head.windows(2).position(|window| window == b"\r\n") {
        lines.push(&head[..end]);
        head = &head[end + 2..];
    }
    lines.push(head);

    lines
}
