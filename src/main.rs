//! Stored-procedure REST gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                      GATEWAY                          │
//!                     │                                                       │
//!  Client Request     │  ┌─────────┐   ┌──────────┐   ┌───────────────────┐   │
//!  ───────────────────┼─▶│  http   │──▶│ routing  │──▶│ api::Procedure-   │   │
//!                     │  │ server  │   │ (regex)  │   │ Handler (auth,    │   │
//!                     │  └─────────┘   └──────────┘   │ params)           │   │
//!                     │                               └─────────┬─────────┘   │
//!                     │                                         ▼             │
//!  Client Response    │  ┌─────────┐   ┌──────────────┐   ┌──────────┐        │
//!  ◀──────────────────┼──│response │◀──│  projection  │◀──│    db    │        │
//!                     │  │         │   │ (state mach.)│   │  events  │        │
//!                     │  └─────────┘   └──────────────┘   └──────────┘        │
//!                     │                                                       │
//!                     │  config · observability · security · lifecycle        │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use sproc_gateway::config::{load_config, validate_config, ConfigError, GatewayConfig};
use sproc_gateway::db::MemoryDatabase;
use sproc_gateway::lifecycle::{shutdown_signal, Shutdown};
use sproc_gateway::net::load_tls_config;
use sproc_gateway::observability::{logging, metrics};
use sproc_gateway::HttpServer;

#[derive(Debug, Parser)]
#[command(name = "sproc-gateway", version, about = "Stored-procedure REST gateway")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

fn load(cli: &Cli) -> Result<GatewayConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    logging::init(&config.observability.log_level);
    tracing::info!("sproc-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        if let Err(e) = metrics::init_metrics(addr) {
            tracing::error!(error = %e, "Failed to start metrics endpoint");
        }
    }

    let db = match &config.database.fixtures {
        Some(path) => {
            let db = MemoryDatabase::from_file(Path::new(path))?;
            tracing::info!(path = %path, procedures = db.len(), "Fixtures loaded");
            db
        }
        None => {
            tracing::warn!("No fixtures configured, every procedure call will fail");
            MemoryDatabase::new()
        }
    };

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config, Arc::new(db))?;

    match tls {
        Some(tls) => {
            let rustls = load_tls_config(&tls).await?;
            server.run_tls(bind_address.parse()?, rustls, shutdown).await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
