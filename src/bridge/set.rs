//! Concurrency-safe collection of live bridges.
//!
//! # Responsibilities
//! - Track which bridges are currently relaying
//! - Remove members without closing them (natural teardown)
//! - Drain and close every member at once (severance, shutdown)
//!
//! # Design Decisions
//! - One exclusive lock around a plain map; every operation is short
//! - Members are keyed by the address of their `Arc` allocation, so two
//!   bridges are the same member only if they are the same instance

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::SharedBridge;

/// Error type for bridge set operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The bridge is not (or no longer) a member of the set.
    #[error("Bridge not found")]
    NotFound,
}

/// Identity of a bridge instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BridgeKey(usize);

impl BridgeKey {
    fn of(bridge: &SharedBridge) -> Self {
        Self(Arc::as_ptr(bridge) as *const () as usize)
    }
}

/// An unordered set of bridges, safe for use from any number of tasks.
#[derive(Default)]
pub struct BridgeSet {
    members: Mutex<HashMap<BridgeKey, SharedBridge>>,
}

impl BridgeSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a bridge. Adding an existing member is a no-op.
    pub fn add(&self, bridge: SharedBridge) {
        self.members.lock().insert(BridgeKey::of(&bridge), bridge);
    }

    /// Remove a bridge without closing it.
    pub fn remove(&self, bridge: &SharedBridge) -> Result<(), BridgeError> {
        self.members
            .lock()
            .remove(&BridgeKey::of(bridge))
            .map(|_| ())
            .ok_or(BridgeError::NotFound)
    }

    /// Check whether the bridge is currently a member.
    pub fn contains(&self, bridge: &SharedBridge) -> bool {
        self.members.lock().contains_key(&BridgeKey::of(bridge))
    }

    /// Number of current members.
    pub fn size(&self) -> usize {
        self.members.lock().len()
    }

    /// Empty the set and close every member exactly once.
    ///
    /// Returns how many bridges were closed.
    pub fn remove_and_close_all(&self) -> usize {
        let drained = std::mem::take(&mut *self.members.lock());
        let count = drained.len();
        for bridge in drained.into_values() {
            bridge.close();
        }
        count
    }
}

impl std::fmt::Debug for BridgeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeSet").field("size", &self.size()).finish()
    }
}
