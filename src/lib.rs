//! Single-active-backend TCP failover proxy.
//!
//! Every accepted client is bridged to the one backend currently marked
//! active. When that backend turns unhealthy its bridges are severed and the
//! next healthy backend takes over for new connections.

pub mod admin;
pub mod backends;
pub mod bridge;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use backends::{Backend, BackendRegistry};
pub use config::schema::ProxyConfig;
pub use lifecycle::{RunningProxy, Shutdown};
pub use routing::ProxyRouter;
