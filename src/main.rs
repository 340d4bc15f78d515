//! restkv - An In-Memory Key-Value Store over HTTP
//!
//! This is the main entry point for the restkv server.
//! It sets up logging, the store and the TCP listener, and serves
//! requests until Ctrl+C.

use anyhow::Context;
use restkv::config::{help_text, Command, Config};
use restkv::handler::RequestHandler;
use restkv::server::serve;
use restkv::storage::Store;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(Command::Serve(config)) => config,
        Ok(Command::Help) => {
            println!("{}", help_text());
            return Ok(());
        }
        Ok(Command::Version) => {
            println!("restkv version {}", restkv::VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", help_text());
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over --log
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .with_context(|| format!("invalid log filter {:?}", config.log_filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // One store for the whole process, shared by every request
    let store = Arc::new(Store::new());
    let handler = RequestHandler::with_max_body_size(Arc::clone(&store), config.max_body_size);

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!(
        version = restkv::VERSION,
        max_body = config.max_body_size,
        "Listening on {}",
        config.bind_address()
    );

    serve(listener, handler, shutdown_signal())
        .await
        .context("server error")?;

    let stats = store.stats();
    info!(
        keys = stats.keys,
        get_ops = stats.get_ops,
        put_ops = stats.put_ops,
        del_ops = stats.del_ops,
        "Server shutdown complete"
    );
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, stopping server..."),
        Err(e) => {
            warn!(error = %e, "Failed to install Ctrl+C handler, serving until killed");
            std::future::pending::<()>().await
        }
    }
}
