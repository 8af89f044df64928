//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Registry → Proxy listener + router
//!     → Health monitor → Admin API
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Close all bridges → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Ordered shutdown: stop accept, close bridges, wait for connection tasks
//! - Shutdown has timeout: stragglers are abandoned after a deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, start_with_registry, PidFile, RunningProxy, StartupError};
