//! Rewriting reverse proxy (v1)
//!
//! Serves a single origin site, strips builder branding from its HTML and
//! caches the rewritten pages in a blob store.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────────┐
//!                        │                  REWRITE PROXY                     │
//!                        │                                                    │
//!     Client Request     │  ┌─────────┐    ┌──────────────┐    ┌──────────┐  │
//!     ───────────────────┼─▶│  http   │───▶│ orchestrator │───▶│ upstream │──┼──▶ Origin
//!                        │  │ server  │    │  (proxy)     │    │  client  │  │
//!                        │  └─────────┘    └──────┬───────┘    └────┬─────┘  │
//!                        │                        │                 │        │
//!                        │                  ┌─────▼─────┐     ┌─────▼─────┐  │
//!                        │                  │   cache   │     │  rewrite  │  │
//!                        │                  │ blob store│     │ branding  │  │
//!                        │                  └───────────┘     └───────────┘  │
//!     Client Response    │  ┌─────────┐                                       │
//!     ◀──────────────────┼──│response │◀── X-Cache-Status / Cache-Control     │
//!                        │  └─────────┘                                       │
//!                        │                                                    │
//!                        │   config · observability · lifecycle               │
//!                        └───────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use rewrite_proxy::config::{load_config, ConfigError};
use rewrite_proxy::lifecycle::{bootstrap, signals, Shutdown};
use rewrite_proxy::observability::{logging, metrics};
use rewrite_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "rewrite-proxy", version, about = "Caching reverse proxy that strips builder branding")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Origin site URL (overrides config and environment)
    #[arg(long, value_name = "URL")]
    origin: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(ConfigError::Validation(errors)) => {
            for error in &errors {
                eprintln!("config error: {error}");
            }
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };
    if let Some(origin) = args.origin {
        config.upstream.origin_url = origin;
        if let Err(errors) = rewrite_proxy::config::validation::validate_config(&config) {
            for error in &errors {
                eprintln!("config error: {error}");
            }
            std::process::exit(2);
        }
    }

    logging::init_logging(&config.observability);
    tracing::info!("rewrite-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = %config.upstream.origin_url,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let orchestrator = Arc::new(bootstrap(&config).await?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::forward_signals(shutdown.clone()));

    let server = HttpServer::new(&config, orchestrator);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
