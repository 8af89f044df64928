//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend's healthcheck port
//! - Report observed transitions to the backend registry

use std::sync::Arc;

use axum::body::Body;
use hyper::{header, Method, Request};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};

use super::state::{ProbeState, Transition};
use crate::backends::{Backend, BackendRegistry};
use crate::config::HealthCheckConfig;

/// Active health checker.
///
/// Probes every backend on its own interval and reports health transitions
/// to the registry.
#[derive(Debug)]
pub struct HealthMonitor {
    registry: Arc<BackendRegistry>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(registry: Arc<BackendRegistry>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            registry,
            config,
            client,
        }
    }

    /// Probe every backend until shutdown.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval_millis = self.config.interval_millis,
            timeout_millis = self.config.timeout_millis,
            path = %self.config.path,
            "Health monitor starting"
        );

        let monitor = Arc::new(self);
        let mut probes = JoinSet::new();
        for backend in monitor.registry.all() {
            let monitor = Arc::clone(&monitor);
            let shutdown = shutdown.resubscribe();
            probes.spawn(async move { monitor.watch(backend, shutdown).await });
        }

        while probes.join_next().await.is_some() {}
        tracing::info!("Health monitor stopped");
    }

    async fn watch(&self, backend: Arc<Backend>, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut state = ProbeState::new(self.config.healthy_threshold, self.config.unhealthy_threshold);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let healthy = self.probe(&backend).await;
                    match state.observe(healthy) {
                        Some(Transition::BecameHealthy) => self.registry.set_healthy(&backend),
                        Some(Transition::BecameUnhealthy) => self.registry.set_unhealthy(&backend),
                        None => {}
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    }

    /// One bounded HTTP probe. Any 2xx is healthy.
    pub async fn probe(&self, backend: &Backend) -> bool {
        let url = backend.healthcheck_url(&self.config.path);

        let request = match Request::builder()
            .method(Method::GET)
            .uri(&url)
            .header(header::USER_AGENT, "failover-proxy-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(backend = %backend.name(), url = %url, error = %e, "Failed to build health check request");
                return false;
            }
        };

        match time::timeout(self.config.timeout(), self.client.request(request)).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::debug!(backend = %backend.name(), status = %response.status(), "Health check failed: non-success status");
                }
                success
            }
            Ok(Err(e)) => {
                tracing::debug!(backend = %backend.name(), error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::debug!(backend = %backend.name(), "Health check failed: timeout");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn status_endpoint(status_line: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    let response = format!("HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        port
    }

    fn monitor() -> HealthMonitor {
        let config = HealthCheckConfig {
            timeout_millis: 300,
            ..HealthCheckConfig::default()
        };
        HealthMonitor::new(Arc::new(BackendRegistry::new(&[])), config)
    }

    #[tokio::test]
    async fn ok_status_is_healthy() {
        let port = status_endpoint("200 OK").await;
        let backend = Backend::new("b", "127.0.0.1", 1, port);
        assert!(monitor().probe(&backend).await);
    }

    #[tokio::test]
    async fn error_status_is_unhealthy() {
        let port = status_endpoint("503 Service Unavailable").await;
        let backend = Backend::new("b", "127.0.0.1", 1, port);
        assert!(!monitor().probe(&backend).await);
    }

    #[tokio::test]
    async fn refused_connection_is_unhealthy() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let backend = Backend::new("b", "127.0.0.1", 1, port);
        assert!(!monitor().probe(&backend).await);
    }

    #[tokio::test]
    async fn silent_endpoint_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let backend = Backend::new("b", "127.0.0.1", 1, port);
        let started = std::time::Instant::now();
        assert!(!monitor().probe(&backend).await);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }
}
