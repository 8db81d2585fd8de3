//! Dashboard proxy server.
//!
//! Serves the governance dashboard pages and relays browser requests to the
//! governance API so the page never calls the API cross-origin.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │               DASHBOARD PROXY                │
//!                      │                                              │
//!   Browser request    │  ┌────────┐   ┌──────────────────────────┐   │
//!   ───────────────────┼─▶│  http  │──▶│ /_stcore/*, /, /original │   │
//!                      │  │ server │   └──────────────────────────┘   │
//!                      │  │        │   ┌──────────┐   ┌──────────┐    │
//!                      │  │        │──▶│  proxy   │──▶│ security │    │
//!                      │  └────────┘   │ target + │   │ headers  │    │
//!                      │               │forwarder │   └────┬─────┘    │
//!                      │               └──────────┘        │          │
//!   Streamed response  │  ┌──────────┐   ┌───────────┐     ▼          │
//!   ◀──────────────────┼──│ response │◀──│  stream   │◀── upstream ◀──┼── Governance API
//!                      │  │  filter  │   │  relay    │                │
//!                      │  └──────────┘   └───────────┘                │
//!                      └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use dashboard_proxy::config::{load_config, ConfigOverrides};
use dashboard_proxy::observability::init_logging;
use dashboard_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "dashboard-proxy")]
#[command(about = "Dashboard server and same-origin proxy for the governance API", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (overrides PORT).
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// Log level (overrides the configured level).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        port: cli.port,
        log_level: cli.log_level,
    };
    let config = load_config(cli.config.as_deref(), &overrides)?;

    init_logging(&config.observability)?;

    tracing::info!("dashboard-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        domain = %config.domino.domain,
        project_id = %config.domino.project_id,
        upstream_timeout_secs = config.proxy.upstream_timeout_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
