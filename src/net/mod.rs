//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (connection id, lifecycle state, tracking)
//!     → Hand off to the routing layer
//!
//! Connection States:
//!     Accepted → BackendSelected → Bridging → Closed
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked so shutdown can wait for relays to drain
//! - No protocol inspection: bytes are forwarded opaquely

pub mod connection;
pub mod listener;
