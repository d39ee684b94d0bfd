//! # Despacho de una conexión
//! src/server/dispatch.rs
//!
//! Ciclo completo de una conexión: leer una vez, parsear, resolver contra la
//! cadena de handlers, escribir la respuesta. El cierre lo hace el event
//! loop al soltar el socket, siempre por el mismo camino.
//!
//! ```text
//! read ─┬─ 0 bytes ──────────────────────────────→ Empty
//!       ├─ error ────────────────────────────────→ ReadFailed
//!       ├─ WouldBlock ───────────────────────────→ Pending (sigue abierta)
//!       └─ datos → parse ─┬─ error ──────────────→ 400 fijo
//!                         └─ ok → route ─┬─ Unhandled → 404 fijo
//!                                        └─ Handled → respuesta del handler
//! ```

use std::io::{self, ErrorKind, Read, Write};
use std::net::IpAddr;

use tracing::{event, Level};

use crate::http::{Request, StatusCode};
use crate::router::{Resolution, Router};
use crate::server::access_log::AccessLog;

/// Respuesta exacta para requests que no se pudieron parsear
pub const BAD_REQUEST_PAYLOAD: &[u8] = b"HTTP/1.0 400 Bad Request\r\n\r\nBad Request";

/// Respuesta exacta cuando ningún handler atiende el request
pub const NOT_FOUND_PAYLOAD: &[u8] = b"HTTP/1.0 404 Not Found\r\n\r\nNot Found!";

/// Socket sobre el que se despacha un request
pub trait Stream: Read + Write {
    /// Se llama una vez leído el request, antes de escribir la respuesta.
    fn before_write(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Stream for mio::net::TcpStream {
    /// La respuesta se escribe en modo bloqueante, igual que la lectura de
    /// archivos del handler.
    fn before_write(&mut self) -> io::Result<()> {
        socket2::SockRef::from(&*self).set_nonblocking(false)
    }
}

/// Cómo terminó el despacho de una conexión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Notificación espuria: no había datos, la conexión sigue abierta
    Pending,

    /// El cliente cerró sin enviar nada
    Empty,

    /// Falló la lectura; no se responde
    ReadFailed,

    /// Se envió el 400 fijo
    BadRequest,

    /// Se envió el 404 fijo
    NotFound,

    /// Se envió la respuesta de un handler
    Responded(StatusCode),
}

impl Dispatch {
    /// Todo menos `Pending` cierra la conexión
    pub fn closes_connection(&self) -> bool {
        !matches!(self, Dispatch::Pending)
    }
}

/// Contexto compartido por todos los despachos de un servidor
pub struct Dispatcher<'a> {
    pub router: &'a Router,
    pub access_log: &'a mut AccessLog,
    pub buffer_size: usize,
}

impl Dispatcher<'_> {
    /// Despacha un request leído de `stream`
    pub fn dispatch<S: Stream>(&mut self, stream: &mut S, client: IpAddr) -> Dispatch {
        let mut buffer = vec![0u8; self.buffer_size];

        // Una sola lectura; lo que no entra en el buffer se descarta
        let read = loop {
            match stream.read(&mut buffer) {
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                other => break other,
            }
        };

        let length = match read {
            Ok(0) => {
                event!(Level::DEBUG, %client, "connection closed without data");
                return Dispatch::Empty;
            }
            Ok(length) => length,
            Err(error) if error.kind() == ErrorKind::WouldBlock => return Dispatch::Pending,
            Err(error) => {
                event!(Level::WARN, %client, %error, "read failed");
                return Dispatch::ReadFailed;
            }
        };

        event!(Level::TRACE, %client, bytes = length, "received request");

        if let Err(error) = stream.before_write() {
            event!(Level::WARN, %client, %error, "failed to prepare socket for writing");
        }

        let request = match Request::parse(&buffer[..length]) {
            Ok(request) => request,
            Err(error) => {
                event!(Level::DEBUG, %client, %error, "failed to parse request");
                self.log_bad_request(client);
                write_payload(stream, BAD_REQUEST_PAYLOAD, client);
                return Dispatch::BadRequest;
            }
        };

        match self.router.route(&request) {
            Resolution::Unhandled { failures } => {
                if !failures.is_empty() {
                    event!(
                        Level::DEBUG,
                        path = request.path(),
                        failures = failures.len(),
                        "request unhandled after handler failures"
                    );
                }

                self.log_request(client, &request, StatusCode::NotFound.as_u16());
                write_payload(stream, NOT_FOUND_PAYLOAD, client);
                Dispatch::NotFound
            }
            Resolution::Handled(response) => {
                let status = response.status();
                self.log_request(client, &request, status.as_u16());

                if let Err(error) = response.write_to(stream) {
                    event!(Level::WARN, %client, %error, "failed to write response");
                }
                Dispatch::Responded(status)
            }
        }
    }

    fn log_bad_request(&mut self, client: IpAddr) {
        if let Err(error) = self.access_log.bad_request(client) {
            event!(Level::WARN, %error, "failed to write access log");
        }
    }

    fn log_request(&mut self, client: IpAddr, request: &Request, status: u16) {
        let result = self
            .access_log
            .request(client, request.method(), request.path(), status);

        if let Err(error) = result {
            event!(Level::WARN, %error, "failed to write access log");
        }
    }
}

fn write_payload<S: Write>(stream: &mut S, payload: &[u8], client: IpAddr) {
    let result = stream.write_all(payload).and_then(|_| stream.flush());

    if let Err(error) = result {
        event!(Level::WARN, %client, %error, "failed to write response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Response;
    use crate::router::{HandlerError, Outcome};
    use std::io::Cursor;
    use std::net::Ipv4Addr;
    use std::sync::{Arc, Mutex};
    use tracing_test::traced_test;

    const CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));

    /// Stream en memoria: lee de `input`, guarda lo escrito en `output`
    struct MockStream {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
        read_error: Option<ErrorKind>,
        before_write_calls: usize,
    }

    impl MockStream {
        fn new(input: &[u8]) -> Self {
            Self {
                input: Cursor::new(input.to_vec()),
                output: Vec::new(),
                read_error: None,
                before_write_calls: 0,
            }
        }

        fn failing(kind: ErrorKind) -> Self {
            let mut stream = Self::new(b"");
            stream.read_error = Some(kind);
            stream
        }
    }

    impl Read for MockStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.read_error {
                Some(kind) => Err(io::Error::from(kind)),
                None => self.input.read(buf),
            }
        }
    }

    impl Write for MockStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Stream for MockStream {
        fn before_write(&mut self) -> io::Result<()> {
            self.before_write_calls += 1;
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn lines(&self) -> Vec<String> {
            let text = String::from_utf8(self.0.lock().unwrap().clone()).unwrap();
            text.lines().map(str::to_string).collect()
        }
    }

    fn hello_router() -> Router {
        let mut router = Router::new();
        router.register(|req: &Request| {
            if req.path() == "/hello" {
                Outcome::Handled(Response::text("hi"))
            } else {
                Outcome::Declined
            }
        });
        router.seal();
        router
    }

    /// Despacha `stream` con un router y un access log en memoria
    fn run(router: &Router, stream: &mut MockStream, buffer_size: usize) -> (Dispatch, SharedBuffer) {
        let log_buffer = SharedBuffer::default();
        let mut access_log = AccessLog::new(log_buffer.clone());
        let mut dispatcher = Dispatcher {
            router,
            access_log: &mut access_log,
            buffer_size,
        };

        let outcome = dispatcher.dispatch(stream, CLIENT);
        (outcome, log_buffer)
    }

    // ==================== Respuestas ====================

    #[test]
    fn test_handled_request() {
        let router = hello_router();
        let mut stream = MockStream::new(b"GET /hello HTTP/1.0\r\n\r\n");

        let (outcome, log) = run(&router, &mut stream, 1024);

        assert_eq!(outcome, Dispatch::Responded(StatusCode::Ok));
        assert_eq!(stream.output, Response::text("hi").to_bytes());
        assert_eq!(stream.before_write_calls, 1);

        let lines = log.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with(" 10.0.0.7 GET /hello 200"));
    }

    #[test]
    fn test_unhandled_writes_exact_404() {
        let router = hello_router();
        let mut stream = MockStream::new(b"GET /missing HTTP/1.0\r\n\r\n");

        let (outcome, log) = run(&router, &mut stream, 1024);

        assert_eq!(outcome, Dispatch::NotFound);
        assert_eq!(stream.output, NOT_FOUND_PAYLOAD);
        assert_eq!(stream.output, b"HTTP/1.0 404 Not Found\r\n\r\nNot Found!");

        let lines = log.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with(" 10.0.0.7 GET /missing 404"));
    }

    #[test]
    fn test_empty_router_writes_404() {
        let router = Router::new();
        let mut stream = MockStream::new(b"DELETE /anything HTTP/1.0\r\n\r\n");

        let (outcome, log) = run(&router, &mut stream, 1024);

        assert_eq!(outcome, Dispatch::NotFound);
        assert!(log.lines()[0].ends_with(" DELETE /anything 404"));
    }

    #[test]
    fn test_parse_failure_writes_exact_400() {
        let router = hello_router();
        let mut stream = MockStream::new(b"\x00\x01\x02\x03garbage");

        let (outcome, log) = run(&router, &mut stream, 1024);

        assert_eq!(outcome, Dispatch::BadRequest);
        assert_eq!(stream.output, b"HTTP/1.0 400 Bad Request\r\n\r\nBad Request");

        let lines = log.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with(" 10.0.0.7 400"));
        assert!(!lines[0].contains("GET"));
    }

    #[test]
    #[traced_test]
    fn test_handler_failure_becomes_404() {
        let mut router = Router::new();
        router.register(|_req: &Request| Outcome::Failed(HandlerError::Internal("disk on fire".into())));
        let mut stream = MockStream::new(b"GET /x HTTP/1.0\r\n\r\n");

        let (outcome, _log) = run(&router, &mut stream, 1024);

        assert_eq!(outcome, Dispatch::NotFound);
        assert_eq!(stream.output, NOT_FOUND_PAYLOAD);
        assert!(logs_contain("handler failed"));
    }

    // ==================== Lectura ====================

    #[test]
    fn test_empty_connection_skips_dispatch() {
        let router = hello_router();
        let mut stream = MockStream::new(b"");

        let (outcome, log) = run(&router, &mut stream, 1024);

        assert_eq!(outcome, Dispatch::Empty);
        assert!(outcome.closes_connection());
        assert!(stream.output.is_empty());
        assert!(log.lines().is_empty());
        assert_eq!(stream.before_write_calls, 0);
    }

    #[test]
    #[traced_test]
    fn test_read_error_closes_without_response() {
        let router = hello_router();
        let mut stream = MockStream::failing(ErrorKind::ConnectionReset);

        let (outcome, log) = run(&router, &mut stream, 1024);

        assert_eq!(outcome, Dispatch::ReadFailed);
        assert!(outcome.closes_connection());
        assert!(stream.output.is_empty());
        assert!(log.lines().is_empty());
        assert!(logs_contain("read failed"));
    }

    #[test]
    fn test_would_block_keeps_connection_open() {
        let router = hello_router();
        let mut stream = MockStream::failing(ErrorKind::WouldBlock);

        let (outcome, _log) = run(&router, &mut stream, 1024);

        assert_eq!(outcome, Dispatch::Pending);
        assert!(!outcome.closes_connection());
        assert!(stream.output.is_empty());
    }

    #[test]
    fn test_oversized_request_is_truncated_not_rejected() {
        let router = hello_router();
        let mut raw = b"GET /hello HTTP/1.0\r\nX-Padding: ".to_vec();
        raw.extend(std::iter::repeat(b'a').take(4096));
        raw.extend_from_slice(b"\r\n\r\n");
        let mut stream = MockStream::new(&raw);

        let (outcome, _log) = run(&router, &mut stream, 64);

        assert_eq!(outcome, Dispatch::Responded(StatusCode::Ok));
    }

    #[test]
    fn test_truncated_inside_header_name_is_answered() {
        let router = hello_router();
        let raw = b"GET /hello HTTP/1.0\r\nUser-Agent: t\r\nAccept: */*\r\n\r\n";
        let cut = b"GET /hello HTTP/1.0\r\nUser-Agent: t\r\nAcc".len();
        let mut stream = MockStream::new(raw);

        let (outcome, log) = run(&router, &mut stream, cut);

        assert_eq!(outcome, Dispatch::Responded(StatusCode::Ok));
        assert_eq!(stream.output, Response::text("hi").to_bytes());
        assert!(log.lines()[0].ends_with(" 10.0.0.7 GET /hello 200"));
    }

    #[test]
    fn test_truncated_inside_multibyte_char_is_answered() {
        let router = hello_router();
        let raw = "GET /nope HTTP/1.0\r\nX-Name: café\r\n\r\n".as_bytes();
        // Corta después del primer byte de "é"
        let cut = "GET /nope HTTP/1.0\r\nX-Name: caf".len() + 1;
        let mut stream = MockStream::new(raw);

        let (outcome, _log) = run(&router, &mut stream, cut);

        assert_eq!(outcome, Dispatch::NotFound);
        assert_eq!(stream.output, NOT_FOUND_PAYLOAD);
    }
}
