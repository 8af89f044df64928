//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the registry from validated configuration
//! - Start background tasks (router, health monitor, admin API)
//! - Bind listeners and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any bind error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The proxy listener is bound before the admin API reports anything

use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinSet;

use super::shutdown::Shutdown;
use crate::admin::{self, auth::Credentials};
use crate::backends::BackendRegistry;
use crate::config::ProxyConfig;
use crate::health::HealthMonitor;
use crate::net::listener::{Listener, ListenerError};
use crate::routing::ProxyRouter;

/// Error type for startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("proxy listener: {0}")]
    Listener(#[from] ListenerError),
    #[error("admin API failed to bind {address}: {source}")]
    AdminBind {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write pid file {path}: {source}")]
    PidFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Handles to a started proxy.
#[derive(Debug)]
pub struct RunningProxy {
    /// Address client traffic is accepted on.
    pub proxy_addr: SocketAddr,
    /// Address of the admin API, when enabled.
    pub admin_addr: Option<SocketAddr>,
    pub registry: Arc<BackendRegistry>,
    pub router: Arc<ProxyRouter>,
    tasks: JoinSet<()>,
}

impl RunningProxy {
    /// Wait for every background task to finish (after shutdown is triggered).
    pub async fn wait(mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Background task failed");
            }
        }
    }
}

/// Start the proxy with a registry built from `config.backends`.
pub async fn start(config: &ProxyConfig, shutdown: &Shutdown) -> Result<RunningProxy, StartupError> {
    let registry = Arc::new(BackendRegistry::new(&config.backends));
    start_with_registry(config, registry, shutdown).await
}

/// Start the proxy around an existing registry.
pub async fn start_with_registry(
    config: &ProxyConfig,
    registry: Arc<BackendRegistry>,
    shutdown: &Shutdown,
) -> Result<RunningProxy, StartupError> {
    let mut tasks = JoinSet::new();

    let listener = Listener::bind(&config.listener).await?;
    let proxy_addr = listener.local_addr().map_err(ListenerError::Bind)?;

    let router = Arc::new(ProxyRouter::new(Arc::clone(&registry), config.timeouts.connect()));
    tasks.spawn(Arc::clone(&router).run(listener, shutdown.subscribe()));

    let monitor = HealthMonitor::new(Arc::clone(&registry), config.health_check.clone());
    tasks.spawn(monitor.run(shutdown.subscribe()));

    let admin_addr = if config.api.enabled {
        let address = config.api.bind_address.clone();
        let admin_listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::AdminBind {
                address: address.clone(),
                source,
            })?;
        let admin_addr = admin_listener
            .local_addr()
            .map_err(|source| StartupError::AdminBind { address, source })?;

        let credentials = Credentials::new(config.api.username.clone(), config.api.password.clone());
        let app = admin::setup_admin_router(Arc::clone(&registry), credentials);
        let admin_shutdown = shutdown.subscribe();
        tasks.spawn(async move {
            if let Err(e) = admin::serve(admin_listener, app, admin_shutdown).await {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
        Some(admin_addr)
    } else {
        tracing::info!("Admin API disabled");
        None
    };

    tracing::info!(
        address = %proxy_addr,
        backends = registry.len(),
        "Proxy started on port {}",
        proxy_addr.port()
    );

    Ok(RunningProxy {
        proxy_addr,
        admin_addr,
        registry,
        router,
        tasks,
    })
}

/// A pid file that is removed when dropped.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Write the current process id to `path`.
    pub fn create(path: &Path) -> Result<Self, StartupError> {
        fs::write(path, format!("{}\n", std::process::id())).map_err(|source| StartupError::PidFile {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Pid file written");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove pid file");
        }
    }
}
