//! telnet-shell: a minimal telnet command shell server
//!
//! Clients connect with `telnet` or `nc`, get a prompt, and run commands:
//! - `help` lists the available commands
//! - `echo [args...]` prints each argument on its own line
//! - `exit` closes the session
//!
//! Features:
//! - Telnet option announcements are accepted and silently ignored
//! - Arguments may be quoted with `'...'` or `"..."`
//! - One task per connection, bounded by a connection limit
//! - Configuration via CLI arguments or TOML file

mod buffer;
mod commands;
mod config;
mod error;
mod protocol;
mod server;
mod session;

use config::Config;
use server::Server;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        workers = ?config.workers,
        max_connections = config.max_connections,
        buffer_size = config.session.buffer_size,
        max_args = config.session.max_args,
        "Starting telnet-shell server"
    );

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(workers) = config.workers {
        builder.worker_threads(workers);
    }
    let runtime = builder.enable_all().build()?;

    runtime.block_on(async move {
        let server = Server::new(config);
        server.run(shutdown_signal()).await
    })?;

    info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
