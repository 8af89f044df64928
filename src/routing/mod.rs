//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted client
//!     → registry.active()            (none → close client)
//!     → dial backend host:port       (failure → close client)
//!     → ConnectionBridge registered in backend set + process-wide set
//!     → relay until EOF, error, severance or shutdown
//!     → removed from both sets
//! ```
//!
//! # Design Decisions
//! - Routing decisions are per connection, never per byte
//! - The backend is captured once at selection; later failovers reach the
//!   connection only through severance
//! - Routing failures end that connection only; nothing is retried

pub mod router;

pub use router::{ProxyRouter, RouteError};
