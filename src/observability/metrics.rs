//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_connections_total` (counter): accepted connections by outcome
//! - `proxy_active_bridges` (gauge): relays currently running
//! - `proxy_severed_connections_total` (counter): bridges closed by failover, per backend
//! - `proxy_failovers_total` (counter): active backend demotions
//! - `proxy_backend_healthy` (gauge): 1=healthy, 0=unhealthy, per backend

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Terminal routing outcome of an accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    Bridged,
    NoBackend,
    DialFailed,
}

impl ConnectionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionOutcome::Bridged => "bridged",
            ConnectionOutcome::NoBackend => "no_backend",
            ConnectionOutcome::DialFailed => "dial_failed",
        }
    }
}

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_connection(outcome: ConnectionOutcome) {
    metrics::counter!("proxy_connections_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn bridge_opened() {
    metrics::gauge!("proxy_active_bridges").increment(1.0);
}

pub fn bridge_closed() {
    metrics::gauge!("proxy_active_bridges").decrement(1.0);
}

pub fn record_severed(backend: &str, count: usize) {
    metrics::counter!("proxy_severed_connections_total", "backend" => backend.to_string())
        .increment(count as u64);
}

pub fn record_failover() {
    metrics::counter!("proxy_failovers_total").increment(1);
}

pub fn record_backend_health(backend: &str, healthy: bool) {
    metrics::gauge!("proxy_backend_healthy", "backend" => backend.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}
