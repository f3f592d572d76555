//! Movies API front door (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ error_translator ──▶ pipeline ──────────────────────────────▶ routes
//!                      (access log,         Admission → BodyParsing →               (users,
//!                       {message} body)     Validation → Authentication              movies)
//!     Client Response                                                                  │
//!     ◀────────────── error_translator ◀──────────────── ApiError / success ◀──────────┘
//!
//!     Cross-cutting: config (TOML + env), logging, metrics, rate-window sweeper, shutdown
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use movies_api::config::load_config;
use movies_api::http::ApiServer;
use movies_api::lifecycle::{signals, Shutdown};
use movies_api::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "movies-api")]
#[command(about = "JSON API front door with rate limiting, validation and bearer auth", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("movies-api: {}", e);
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.observability, config.environment.mode);
    tracing::info!("movies-api v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        mode = ?config.environment.mode,
        rate_limit_max = config.rate_limit.max_requests,
        rate_limit_window_secs = config.rate_limit.window_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );
    if let Some(uri) = config.environment.database_uri() {
        tracing::info!(database_uri = %uri, "Document store selected");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        trigger.trigger();
    });

    let server = ApiServer::new(config);
    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
