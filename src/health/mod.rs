//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Per-backend probe loop (monitor.rs):
//!     Periodic timer
//!     → HTTP GET on the backend's healthcheck port (bounded timeout)
//!     → state.rs (consecutive success/failure counters)
//!     → on transition: registry.set_healthy / registry.set_unhealthy
//! ```
//!
//! # Design Decisions
//! - The monitor only reports transitions; the registry owns health flags
//! - State transitions require consecutive successes/failures
//! - One probe loop per backend so a slow node never delays the others

pub mod monitor;
pub mod state;

pub use monitor::HealthMonitor;
pub use state::{ProbeState, Transition};
