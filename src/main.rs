//! Failover proxy binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌───────────────────────────────────────────────┐
//!                  │                FAILOVER PROXY                 │
//!                  │                                               │
//!   Client ────────┼─▶ net::listener ──▶ routing::router ──────────┼──▶ active backend
//!                  │                          │                    │
//!                  │                          ▼                    │
//!                  │                  bridge (relay, close)        │
//!                  │                          ▲                    │
//!                  │                          │ sever              │
//!                  │   health::monitor ──▶ backends::registry      │
//!                  │                          ▲                    │
//!   Operator ──────┼─▶ admin (Basic auth) ────┘                    │
//!                  └───────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use failover_proxy::config::load_config;
use failover_proxy::lifecycle::{self, signals, PidFile, Shutdown};
use failover_proxy::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "failover-proxy")]
#[command(about = "TCP proxy that keeps every client on a single healthy backend", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Write the process id here while running.
    #[arg(long)]
    pid_file: Option<PathBuf>,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(level) = args.log_level {
        config.observability.log_level = level;
    }

    logging::init(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "failover-proxy starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        backends = config.backends.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let _pid_file = args.pid_file.as_deref().map(PidFile::create).transpose()?;

    let shutdown = Shutdown::new();
    let proxy = lifecycle::start(&config, &shutdown).await?;
    signals::spawn_signal_handler(shutdown.clone());

    proxy.wait().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
