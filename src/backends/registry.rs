//! Backend registry and active-backend election.
//!
//! # Responsibilities
//! - Own every configured backend and its health flag
//! - Track the single active backend
//! - Demote, sever, and re-elect when the active backend goes unhealthy
//!
//! # Invariants
//! - At most one backend is active
//! - If any backend is healthy, the active backend exists and is healthy
//! - Health flags and the active pointer only change under `state`'s write lock

use std::sync::Arc;

use parking_lot::RwLock;

use super::backend::{Backend, BackendStatus};
use crate::config::BackendConfig;
use crate::observability::metrics;

/// Detached iterator over a registry snapshot. Holds no lock.
pub type Snapshot = std::vec::IntoIter<Arc<Backend>>;

/// Builds the backend instance for one configured node.
pub trait BackendProvider: Send + Sync {
    fn provide(&self, config: &BackendConfig) -> Arc<Backend>;
}

impl<F> BackendProvider for F
where
    F: Fn(&BackendConfig) -> Arc<Backend> + Send + Sync,
{
    fn provide(&self, config: &BackendConfig) -> Arc<Backend> {
        self(config)
    }
}

/// The provider used outside of tests.
pub fn default_provider(config: &BackendConfig) -> Arc<Backend> {
    Arc::new(Backend::from_config(config))
}

#[derive(Debug)]
struct Member {
    backend: Arc<Backend>,
    healthy: bool,
}

#[derive(Debug)]
struct RegistryState {
    members: Vec<Member>,
    active: Option<Arc<Backend>>,
}

impl RegistryState {
    fn member_mut(&mut self, backend: &Arc<Backend>) -> Option<&mut Member> {
        self.members
            .iter_mut()
            .find(|m| Arc::ptr_eq(&m.backend, backend))
    }

    fn is_active(&self, backend: &Arc<Backend>) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| Arc::ptr_eq(active, backend))
    }

    fn next_healthy(&self) -> Option<Arc<Backend>> {
        self.members
            .iter()
            .find(|m| m.healthy)
            .map(|m| Arc::clone(&m.backend))
    }
}

/// Owns the backends and decides which one receives traffic.
#[derive(Debug)]
pub struct BackendRegistry {
    state: RwLock<RegistryState>,
}

impl BackendRegistry {
    /// Build a registry with one backend per config entry.
    ///
    /// Every backend starts healthy and one of them is elected active.
    pub fn new(configs: &[BackendConfig]) -> Self {
        Self::with_provider(configs, &default_provider)
    }

    /// Build a registry, constructing each backend through `provider`.
    pub fn with_provider<P>(configs: &[BackendConfig], provider: &P) -> Self
    where
        P: BackendProvider + ?Sized,
    {
        let members: Vec<Member> = configs
            .iter()
            .map(|config| Member {
                backend: provider.provide(config),
                healthy: true,
            })
            .collect();

        for member in &members {
            metrics::record_backend_health(member.backend.name(), true);
        }

        let mut state = RegistryState {
            members,
            active: None,
        };
        state.active = state.next_healthy();

        if let Some(active) = &state.active {
            tracing::info!(backend = %active.name(), "Initial active backend elected");
        }

        Self {
            state: RwLock::new(state),
        }
    }

    /// Every backend, snapshotted at call time.
    pub fn all(&self) -> Snapshot {
        let state = self.state.read();
        let backends: Vec<_> = state.members.iter().map(|m| Arc::clone(&m.backend)).collect();
        backends.into_iter()
    }

    /// Healthy backends, snapshotted at call time.
    pub fn healthy(&self) -> Snapshot {
        let state = self.state.read();
        let backends: Vec<_> = state
            .members
            .iter()
            .filter(|m| m.healthy)
            .map(|m| Arc::clone(&m.backend))
            .collect();
        backends.into_iter()
    }

    /// Some backend, if any are configured. For diagnostics.
    pub fn any(&self) -> Option<Arc<Backend>> {
        self.state.read().members.first().map(|m| Arc::clone(&m.backend))
    }

    /// The backend new connections should be routed to.
    pub fn active(&self) -> Option<Arc<Backend>> {
        self.state.read().active.clone()
    }

    /// Current health flag of `backend`. Unknown instances are unhealthy.
    pub fn is_healthy(&self, backend: &Arc<Backend>) -> bool {
        self.state
            .read()
            .members
            .iter()
            .any(|m| m.healthy && Arc::ptr_eq(&m.backend, backend))
    }

    pub fn len(&self) -> usize {
        self.state.read().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark `backend` healthy, electing it if nothing is active.
    pub fn set_healthy(&self, backend: &Arc<Backend>) {
        let mut state = self.state.write();

        let Some(member) = state.member_mut(backend) else {
            tracing::warn!(backend = %backend.name(), "Ignoring health change for unknown backend");
            return;
        };
        let was_healthy = std::mem::replace(&mut member.healthy, true);

        if !was_healthy {
            tracing::info!(backend = %backend.name(), "Backend became healthy again");
            metrics::record_backend_health(backend.name(), true);
        }

        if state.active.is_none() {
            tracing::info!(backend = %backend.name(), "Backend elected active");
            state.active = Some(Arc::clone(backend));
        }
    }

    /// Mark `backend` unhealthy. If it was active, sever its connections and
    /// elect another healthy backend (or none).
    pub fn set_unhealthy(&self, backend: &Arc<Backend>) {
        let mut state = self.state.write();

        let Some(member) = state.member_mut(backend) else {
            tracing::warn!(backend = %backend.name(), "Ignoring health change for unknown backend");
            return;
        };
        let was_healthy = std::mem::replace(&mut member.healthy, false);

        if was_healthy {
            tracing::info!(backend = %backend.name(), "Backend became unhealthy");
            metrics::record_backend_health(backend.name(), false);
        }

        if !state.is_active(backend) {
            return;
        }

        tracing::info!(
            backend = %backend.name(),
            "Active backend became unhealthy. Switching over to next available..."
        );
        let severed = backend.sever_connections();
        metrics::record_severed(backend.name(), severed);
        metrics::record_failover();

        state.active = state.next_healthy();
        match &state.active {
            Some(next) => tracing::info!(backend = %next.name(), "Backend elected active"),
            None => tracing::warn!("No healthy backend available; refusing new connections"),
        }
    }

    /// Consistent view of every backend for the admin API.
    pub fn as_json(&self) -> Vec<BackendStatus> {
        let state = self.state.read();
        state
            .members
            .iter()
            .map(|m| m.backend.status(m.healthy, state.is_active(&m.backend)))
            .collect()
    }
}
