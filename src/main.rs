//! Virtual-host HTTP reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request        ┌──────────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ http::server ──▶ http::request (classify)      │
//!                           │                      │                           │
//!                           │        ┌─────────────┼──────────────┐            │
//!                           │        ▼             ▼              ▼            │
//!                           │   admin (status)  preflight   routing (vhosts)   │
//!                           │                                     │            │
//!                           │                                     ▼            │
//!     Client Response       │                              http::forwarder ────┼──▶ Backend
//!     ◀─────────────────────┼── http::response (CORS) ◀───────────┘            │
//!                           │                                                  │
//!                           │   config · lifecycle · observability             │
//!                           └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use vhost_proxy::config::{load_config, ProxyConfig};
use vhost_proxy::lifecycle::{spawn_signal_handler, ProxyServer, StartupError};
use vhost_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "vhost-proxy")]
#[command(about = "Virtual-host HTTP reverse proxy", long_about = None)]
struct Cli {
    /// Path to the configuration file (`.json` or `.toml`).
    #[arg(short, long, default_value = ".pio.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            tracing::error!(path = %cli.config.display(), "Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability.log_level);
    tracing::info!("vhost-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to install metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = ProxyServer::bind(&config).await?;
    spawn_signal_handler(server.shutdown_handle());
    server.run().await
}
