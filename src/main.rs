//! Task API server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http::server (axum listener + tower-http layers)
//!                    │  CORS preflight, request ID, tracing, timeout, body limit
//!                    ▼
//!                routing::Router (method table, path templates, handler chains)
//!                    │
//!                    ▼
//!                http::body (JSON / multipart pre-processing)
//!                    │
//!                    ▼
//!                tasks::controller ──▶ tasks::repository (data/tasks.json)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use task_api::app::{self, AppContext};
use task_api::config::{self, ServerConfig};
use task_api::http::HttpServer;
use task_api::lifecycle::{signals, Shutdown};
use task_api::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "task-api", version, about = "Task management HTTP API")]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "TASK_API_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port, replacing the port of the configured bind address.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Task data file.
    #[arg(long, env = "DATA_FILE")]
    data_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => ServerConfig::default(),
    };
    apply_overrides(&mut config, &args);
    config::validate_config(&config).map_err(config::ConfigError::Validation)?;

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "task-api starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        data_file = %config.storage.data_file.display(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let ctx = AppContext::from_config(config).await?;
    let router = app::build_router(&ctx)?;
    let server = HttpServer::new(&ctx.config, router);

    let shutdown = Shutdown::new();
    signals::spawn_listener(shutdown.clone());
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn apply_overrides(config: &mut ServerConfig, args: &Args) {
    if let Some(port) = args.port {
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or("0.0.0.0");
        config.listener.bind_address = format!("{host}:{port}");
    }
    if let Some(data_file) = &args.data_file {
        config.storage.data_file = data_file.clone();
    }
}
