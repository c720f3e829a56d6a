//! SQL Session MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to open short-lived MySQL and PostgreSQL sessions and run SQL on them.

use sql_session_mcp::config::Config;
use sql_session_mcp::db::SessionRegistry;
use sql_session_mcp::transport::{StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout carries the MCP protocol.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    // Initialize logging
    init_tracing(&config);

    let registry_config = config.registry_config();
    info!(
        capacity = registry_config.capacity,
        ttl_secs = registry_config.ttl.as_secs(),
        connect_timeout_secs = config.connect_timeout_duration().as_secs(),
        "Starting SQL Session MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let registry = Arc::new(SessionRegistry::with_config(registry_config));

    // Start the sweep for expired sessions
    SessionRegistry::start_cleanup_task(registry.clone());

    let transport = StdioTransport::new(registry, config.connect_timeout_duration());
    info!(transport = transport.name(), "Serving MCP");

    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
