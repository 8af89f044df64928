//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend node (identity is immutable)
//! - Own the set of bridges currently pinned to it
//! - Sever those bridges when the node is demoted
//!
//! Health is not stored here: the registry owns every health flag so that
//! health and the active pointer change under a single lock.

use serde::{Deserialize, Serialize};

use crate::bridge::BridgeSet;
use crate::config::BackendConfig;

/// A single backend node.
#[derive(Debug)]
pub struct Backend {
    name: String,
    host: String,
    port: u16,
    healthcheck_port: u16,
    /// Connections currently relaying to this backend.
    bridges: BridgeSet,
}

/// Admin-facing projection of a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub healthcheck_port: u16,
    pub healthy: bool,
    pub active: bool,
}

impl Backend {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16, healthcheck_port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            healthcheck_port,
            bridges: BridgeSet::new(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(
            config.name.clone(),
            config.host.clone(),
            config.port,
            config.healthcheck_port,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn healthcheck_port(&self) -> u16 {
        self.healthcheck_port
    }

    /// `host:port` for dialing proxied traffic.
    pub fn address(&self) -> String {
        join_host_port(&self.host, self.port)
    }

    /// URL the health monitor probes.
    pub fn healthcheck_url(&self, path: &str) -> String {
        format!("http://{}{}", join_host_port(&self.host, self.healthcheck_port), path)
    }

    /// Bridges pinned to this backend.
    pub fn bridges(&self) -> &BridgeSet {
        &self.bridges
    }

    /// Close every connection pinned to this backend.
    ///
    /// Returns how many bridges were closed.
    pub fn sever_connections(&self) -> usize {
        let severed = self.bridges.remove_and_close_all();
        tracing::info!(backend = %self.name, severed, "Severed backend connections");
        severed
    }

    /// Project identity plus registry-computed flags.
    pub fn status(&self, healthy: bool, active: bool) -> BackendStatus {
        BackendStatus {
            name: self.name.clone(),
            host: self.host.clone(),
            port: self.port,
            healthcheck_port: self.healthcheck_port,
            healthy,
            active,
        }
    }
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
