//! # minihttpd - Entry Point
//! src/main.rs
//!
//! Punto de entrada del servidor HTTP/1.0.

use anyhow::Context;
use tracing::{event, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use minihttpd::config::Config;
use minihttpd::server::Server;

fn main() {
    let config = Config::new();
    init_logging(&config.log_filter);

    if let Err(error) = run(config) {
        event!(Level::ERROR, "fatal: {:#}", error);
        std::process::exit(1);
    }
}

fn run(config: Config) -> anyhow::Result<()> {
    config.log_summary();

    let mut server = Server::new(config);
    if !server.config().no_static {
        server.add_static_handler();
    }

    let server = server.bind().context("failed to start server")?;
    server.run().context("event loop stopped")?;

    Ok(())
}

/// Logs de diagnóstico a stderr; stdout queda para el access log
fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("logging already initialized");
    }
}
