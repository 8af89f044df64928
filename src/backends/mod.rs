//! Backend health registry subsystem.
//!
//! # Data Flow
//! ```text
//! BackendConfig[] (startup)
//!     → BackendProvider (build one Backend per config)
//!     → registry.rs (health flags + active pointer under one lock)
//!
//! Routing:       ProxyRouter → registry.active() → Backend (dial address, bridge set)
//! Health change: HealthMonitor → set_healthy / set_unhealthy
//!                    → active demoted? backend.sever_connections() + re-elect
//! Admin:         registry.as_json() → BackendStatus[]
//! ```
//!
//! # Design Decisions
//! - Exactly one active backend at a time; this is failover, not load balancing
//! - Backends are compared by instance identity (`Arc::ptr_eq`)
//! - Iteration hands out owned snapshots, never a live lock

pub mod backend;
pub mod registry;

pub use backend::{Backend, BackendStatus};
pub use registry::{default_provider, BackendProvider, BackendRegistry, Snapshot};
