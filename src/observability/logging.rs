//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Pick pretty or JSON output from configuration
//! - Let `RUST_LOG` override the configured level

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Error returned when a global subscriber is already installed.
#[derive(Debug, thiserror::Error)]
#[error("Failed to initialize logging: {0}")]
pub struct LoggingError(#[from] tracing_subscriber::util::TryInitError);

/// Build the filter: `RUST_LOG` wins, otherwise the configured level for this
/// crate plus `tower_http`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("failover_proxy={level},tower_http={level}")))
}

/// Install the global subscriber.
pub fn init(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(env_filter(&config.log_level))
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .try_init()?;

    Ok(())
}
