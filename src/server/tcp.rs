//! # Servidor TCP
//! src/server/tcp.rs
//!
//! Event loop de un solo hilo basado en readiness (`mio`). Vigila el socket
//! de escucha y todas las conexiones abiertas:
//!
//! ```text
//!            ┌──────────── poll ────────────┐
//!            │                              │
//!   listener legible                 conexión legible
//!            │                              │
//!   accept → OPEN (watched)       read → parse → route → write
//!                                           │
//!                                  close + quitar del set
//! ```
//!
//! Cada conexión atiende exactamente un request. Todo es secuencial: un
//! handler lento bloquea al resto de las conexiones.

use std::collections::HashMap;
use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::time::Duration;

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tracing::{event, instrument, Level};

use crate::config::{Config, ConfigError};
use crate::handlers::StaticFiles;
use crate::router::{Handler, Router};
use crate::server::access_log::AccessLog;
use crate::server::dispatch::Dispatcher;

const LISTENER: Token = Token(0);

const EVENTS_CAPACITY: usize = 128;

/// Espera entre reintentos de accept después de un error (ej: EMFILE)
const ACCEPT_RETRY: Duration = Duration::from_millis(100);

/// Fallas fatales del servidor
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to create socket: {0}")]
    Socket(#[source] io::Error),

    #[error("failed to bind socket to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("socket failed to listen: {0}")]
    Listen(#[source] io::Error),

    #[error("failed to set up event loop: {0}")]
    EventLoop(#[source] io::Error),

    #[error("failed to wait for readiness: {0}")]
    Poll(#[source] io::Error),
}

/// Servidor HTTP/1.0: configuración, cadena de handlers y access log
///
/// # Ejemplo
///
/// ```no_run
/// use minihttpd::config::Config;
/// use minihttpd::server::Server;
///
/// let mut server = Server::new(Config::default());
/// server.add_static_handler();
///
/// let server = server.bind().expect("bind");
/// server.run().expect("event loop");
/// ```
pub struct Server {
    config: Config,
    router: Router,
    access_log: AccessLog,
}

impl Server {
    /// Crea un servidor sin handlers, con access log en stdout
    pub fn new(config: Config) -> Self {
        Self {
            config,
            router: Router::new(),
            access_log: AccessLog::stdout(),
        }
    }

    /// Reemplaza el destino del access log
    pub fn with_access_log(mut self, access_log: AccessLog) -> Self {
        self.access_log = access_log;
        self
    }

    /// Registra un handler. El orden de registro es el orden de resolución.
    pub fn register<H>(&mut self, handler: H)
    where
        H: Handler + 'static,
    {
        self.router.register(handler);
    }

    /// Registra el handler de archivos estáticos con el prefijo y la raíz
    /// de la configuración
    pub fn add_static_handler(&mut self) {
        let handler = StaticFiles::new(
            self.config.static_prefix.clone(),
            self.config.static_root.clone(),
        );
        self.register(handler);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Abre el socket de escucha y prepara el event loop
    ///
    /// Sella la cadena de handlers: a partir de aquí el orden de resolución
    /// queda fijo.
    #[instrument("server::bind", skip_all)]
    pub fn bind(mut self) -> Result<BoundServer, ServerError> {
        self.config.validate()?;
        let addr = self.config.socket_addr()?;

        self.router.seal();

        let mut listener = listen(addr, self.config.backlog)?;
        let local_addr = listener.local_addr().map_err(ServerError::Socket)?;

        let poll = Poll::new().map_err(ServerError::EventLoop)?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .map_err(ServerError::EventLoop)?;

        event!(Level::INFO, addr = %local_addr, handlers = self.router.len(), "listening");

        Ok(BoundServer {
            server: self,
            listener,
            local_addr,
            poll,
            connections: HashMap::new(),
            next_token: LISTENER.0,
            accept_paused: false,
        })
    }
}

/// Conexión aceptada que espera su único request
struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

/// Servidor con el socket de escucha abierto, listo para `run`
pub struct BoundServer {
    server: Server,
    listener: TcpListener,
    local_addr: SocketAddr,
    poll: Poll,
    connections: HashMap<Token, Connection>,
    next_token: usize,

    /// Se dejó de aceptar por el límite de conexiones o por un error de
    /// accept. Se reintenta al cerrar una conexión y, si hay lugar, en cada
    /// vuelta del loop.
    accept_paused: bool,
}

impl BoundServer {
    /// Dirección real de escucha (útil con puerto 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Corre el event loop. Solo retorna ante una falla fatal.
    #[instrument("server::run", skip_all, fields(addr = %self.local_addr))]
    pub fn run(mut self) -> Result<(), ServerError> {
        let mut events = Events::with_capacity(EVENTS_CAPACITY);

        loop {
            if let Err(error) = self.poll.poll(&mut events, self.accept_retry()) {
                if error.kind() == ErrorKind::Interrupted {
                    continue;
                }
                return Err(ServerError::Poll(error));
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept_connections(),
                    token => self.handle_connection(token),
                }
            }

            // La cola del listener no vuelve a notificar lo que ya estaba
            // pendiente cuando falló el accept
            if self.accept_retry().is_some() {
                self.accept_connections();
            }
        }
    }

    /// Timeout de `poll` mientras haya accepts pendientes de reintentar
    fn accept_retry(&self) -> Option<Duration> {
        let has_room = self.connections.len() < self.server.config.max_connections;
        (self.accept_paused && has_room).then_some(ACCEPT_RETRY)
    }

    /// Acepta conexiones hasta vaciar la cola o llegar al límite.
    ///
    /// Las notificaciones de mio son edge-triggered: si quedan conexiones en
    /// la cola no llega otra notificación hasta que entre una nueva.
    fn accept_connections(&mut self) {
        loop {
            if self.connections.len() >= self.server.config.max_connections {
                if !self.accept_paused {
                    event!(
                        Level::WARN,
                        limit = self.server.config.max_connections,
                        "connection limit reached, pausing accepts"
                    );
                }
                self.accept_paused = true;
                return;
            }

            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    let token = self.next_token();

                    let result = self
                        .poll
                        .registry()
                        .register(&mut stream, token, Interest::READABLE);
                    if let Err(error) = result {
                        event!(Level::WARN, %peer, %error, "failed to watch connection");
                        continue;
                    }

                    event!(Level::DEBUG, %peer, "connection accepted");
                    self.connections.insert(token, Connection { stream, peer });
                }
                Err(error) if error.kind() == ErrorKind::WouldBlock => {
                    self.accept_paused = false;
                    return;
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => {
                    event!(Level::ERROR, %error, "failed to accept connection");
                    self.accept_paused = true;
                    return;
                }
            }
        }
    }

    /// Un ciclo read-dispatch-write para una conexión legible
    fn handle_connection(&mut self, token: Token) {
        let Some(connection) = self.connections.get_mut(&token) else {
            return;
        };

        let mut dispatcher = Dispatcher {
            router: &self.server.router,
            access_log: &mut self.server.access_log,
            buffer_size: self.server.config.buffer_size,
        };
        let outcome = dispatcher.dispatch(&mut connection.stream, connection.peer.ip());

        if outcome.closes_connection() {
            self.close(token);
        }
    }

    /// Cierra la conexión y la quita del set vigilado
    fn close(&mut self, token: Token) {
        let Some(mut connection) = self.connections.remove(&token) else {
            return;
        };

        if let Err(error) = self.poll.registry().deregister(&mut connection.stream) {
            event!(Level::DEBUG, %error, "failed to deregister connection");
        }
        event!(Level::DEBUG, peer = %connection.peer, "connection closed");
        drop(connection);

        if self.accept_paused {
            self.accept_connections();
        }
    }

    fn next_token(&mut self) -> Token {
        loop {
            self.next_token = self.next_token.wrapping_add(1);
            let token = Token(self.next_token);

            if token != LISTENER && !self.connections.contains_key(&token) {
                return token;
            }
        }
    }
}

impl Drop for BoundServer {
    fn drop(&mut self) {
        event!(Level::DEBUG, open = self.connections.len(), "closing");
    }
}

/// Crea el socket de escucha no bloqueante con el backlog pedido
fn listen(addr: SocketAddr, backlog: i32) -> Result<TcpListener, ServerError> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(ServerError::Socket)?;

    socket
        .set_reuse_address(true)
        .map_err(ServerError::Socket)?;
    socket.set_nonblocking(true).map_err(ServerError::Socket)?;
    socket
        .bind(&addr.into())
        .map_err(|source| ServerError::Bind { addr, source })?;
    socket.listen(backlog).map_err(ServerError::Listen)?;

    let listener: std::net::TcpListener = socket.into();
    Ok(TcpListener::from_std(listener))
}
