//! Connection bridging subsystem.
//!
//! # Data Flow
//! ```text
//! Client socket + backend socket
//!     → connection.rs (ConnectionBridge: two streaming copies, close signal)
//!     → set.rs (BridgeSet: per-backend and process-wide membership)
//!
//! Teardown paths:
//!     Natural:   one copy hits EOF/error → both sockets dropped → removed from sets
//!     Severance: Backend::sever_connections → BridgeSet::remove_and_close_all
//!     Shutdown:  ProxyRouter → process-wide BridgeSet::remove_and_close_all
//! ```
//!
//! # Design Decisions
//! - `Bridge` is a trait so severance and shutdown can run against fakes
//! - Closing only signals the relay task; sockets are dropped by their owner
//! - Removal and closing are separate operations

pub mod connection;
pub mod set;

use std::sync::Arc;

pub use connection::{ConnectionBridge, RelayEnd};
pub use set::{BridgeError, BridgeSet};

/// A live duplex relay that can be torn down from outside.
pub trait Bridge: Send + Sync {
    /// Close both legs of the relay.
    ///
    /// Must be idempotent and must never block on I/O, since callers may
    /// hold a collection lock while closing.
    fn close(&self);
}

/// Shared handle used as the element type of every [`BridgeSet`].
pub type SharedBridge = Arc<dyn Bridge>;
