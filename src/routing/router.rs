//! Accept loop and per-connection routing.
//!
//! # Responsibilities
//! - Accept client connections without blocking on any one of them
//! - Route each connection to the backend active at selection time
//! - Register bridges with the owning backend and the process-wide set
//! - Close everything on shutdown

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::backends::{Backend, BackendRegistry};
use crate::bridge::{Bridge, BridgeError, BridgeSet, ConnectionBridge, RelayEnd, SharedBridge};
use crate::net::connection::{ConnectionId, ConnectionState, ConnectionTracker};
use crate::net::listener::Listener;
use crate::observability::metrics::{self, ConnectionOutcome};

/// How long shutdown waits for connection tasks after closing their bridges.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Terminal routing failure for a single client connection.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("no active backend")]
    NoActiveBackend,
    #[error("failed to dial backend {backend} at {address}: {source}")]
    Dial {
        backend: String,
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out dialing backend {backend} at {address}")]
    DialTimeout { backend: String, address: String },
}

impl RouteError {
    fn outcome(&self) -> ConnectionOutcome {
        match self {
            RouteError::NoActiveBackend => ConnectionOutcome::NoBackend,
            RouteError::Dial { .. } | RouteError::DialTimeout { .. } => ConnectionOutcome::DialFailed,
        }
    }
}

/// Routes every accepted client to the active backend.
#[derive(Debug)]
pub struct ProxyRouter {
    registry: Arc<BackendRegistry>,
    /// Every live bridge, regardless of backend. Drained on shutdown.
    bridges: Arc<BridgeSet>,
    connect_timeout: Duration,
    tracker: ConnectionTracker,
    shutting_down: AtomicBool,
}

impl ProxyRouter {
    pub fn new(registry: Arc<BackendRegistry>, connect_timeout: Duration) -> Self {
        Self {
            registry,
            bridges: Arc::new(BridgeSet::new()),
            connect_timeout,
            tracker: ConnectionTracker::new(),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// The process-wide set of live bridges.
    pub fn bridges(&self) -> &Arc<BridgeSet> {
        &self.bridges
    }

    /// Number of connection tasks still running.
    pub fn connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Accept connections until shutdown, then close every live bridge.
    pub async fn run(self: Arc<Self>, listener: Listener, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr, permit)) => {
                        let id = ConnectionId::new();
                        let guard = self.tracker.track(id);
                        let router = Arc::clone(&self);
                        tokio::spawn(
                            async move {
                                router.serve(id, stream).await;
                                drop(guard);
                                drop(permit);
                            }
                            .instrument(tracing::info_span!("connection", id = %id, peer = %peer_addr)),
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Accept error");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Proxy router received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        drop(listener);
        self.close_all().await;
    }

    /// Stop routing and close every live bridge.
    pub async fn close_all(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        let closed = self.bridges.remove_and_close_all();
        tracing::info!(closed, "Closed all bridges");

        if tokio::time::timeout(DRAIN_TIMEOUT, self.tracker.wait_idle())
            .await
            .is_err()
        {
            tracing::warn!(remaining = self.tracker.active_count(), "Connections still draining after timeout");
        }
    }

    async fn serve(&self, id: ConnectionId, client: TcpStream) {
        match self.handle_connection(id, client).await {
            Ok(end) => {
                tracing::debug!(state = %ConnectionState::Closed, reason = end.as_str(), "Connection finished");
            }
            Err(e) => {
                metrics::record_connection(e.outcome());
                match e {
                    RouteError::NoActiveBackend => {
                        tracing::warn!("No active backend; closing client connection")
                    }
                    e => tracing::warn!(error = %e, "Backend dial failed; closing client connection"),
                }
            }
        }
    }

    /// Route one accepted client. The client socket is closed when this returns.
    pub async fn handle_connection(&self, id: ConnectionId, client: TcpStream) -> Result<RelayEnd, RouteError> {
        tracing::debug!(state = %ConnectionState::Accepted, "Routing connection");

        let backend = self.registry.active().ok_or(RouteError::NoActiveBackend)?;
        tracing::debug!(state = %ConnectionState::BackendSelected, backend = %backend.name(), "Backend selected");

        let upstream = self.dial(&backend).await?;

        let bridge = Arc::new(ConnectionBridge::new(id));
        let shared: SharedBridge = bridge.clone();
        backend.bridges().add(Arc::clone(&shared));
        self.bridges.add(Arc::clone(&shared));

        // A demotion or shutdown that drained the sets before the adds above
        // would otherwise miss this bridge.
        if self.shutting_down.load(Ordering::SeqCst) || !self.registry.is_healthy(&backend) {
            bridge.close();
        }

        metrics::record_connection(ConnectionOutcome::Bridged);
        metrics::bridge_opened();
        tracing::debug!(state = %ConnectionState::Bridging, backend = %backend.name(), "Relaying");

        let end = bridge.relay(client, upstream).await;

        metrics::bridge_closed();
        self.release(&backend, &bridge, &shared);
        Ok(end)
    }

    async fn dial(&self, backend: &Backend) -> Result<TcpStream, RouteError> {
        let address = backend.address();
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(RouteError::Dial {
                backend: backend.name().to_string(),
                address,
                source,
            }),
            Err(_) => Err(RouteError::DialTimeout {
                backend: backend.name().to_string(),
                address,
            }),
        }
    }

    fn release(&self, backend: &Backend, bridge: &ConnectionBridge, shared: &SharedBridge) {
        if let Err(BridgeError::NotFound) = backend.bridges().remove(shared) {
            tracing::debug!(backend = %backend.name(), "Bridge already severed from backend");
        }
        if let Err(BridgeError::NotFound) = self.bridges.remove(shared) {
            tracing::debug!(connection_id = %bridge.id(), "Bridge already removed by shutdown");
        }
    }
}
