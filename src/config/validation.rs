//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Detect duplicate backend names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("at least one backend must be configured")]
    NoBackends,
    #[error("backend #{index} has an empty name")]
    EmptyBackendName { index: usize },
    #[error("backend {name} has an empty host")]
    EmptyBackendHost { name: String },
    #[error("backend {name} is configured more than once")]
    DuplicateBackend { name: String },
    #[error("backend {name} has a zero {field}")]
    ZeroPort { name: String, field: &'static str },
    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("api username and password must be set when the api is enabled")]
    MissingCredentials,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = HashSet::new();
    for (index, backend) in config.backends.iter().enumerate() {
        if backend.name.is_empty() {
            errors.push(ValidationError::EmptyBackendName { index });
        } else if !seen.insert(backend.name.as_str()) {
            errors.push(ValidationError::DuplicateBackend {
                name: backend.name.clone(),
            });
        }
        if backend.host.is_empty() {
            errors.push(ValidationError::EmptyBackendHost {
                name: backend.name.clone(),
            });
        }
        if backend.port == 0 {
            errors.push(ValidationError::ZeroPort {
                name: backend.name.clone(),
                field: "port",
            });
        }
        if backend.healthcheck_port == 0 {
            errors.push(ValidationError::ZeroPort {
                name: backend.name.clone(),
                field: "healthcheck_port",
            });
        }
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.max_connections",
        });
    }

    let health = &config.health_check;
    for (field, value) in [
        ("health_check.interval_millis", health.interval_millis),
        ("health_check.timeout_millis", health.timeout_millis),
        ("health_check.healthy_threshold", u64::from(health.healthy_threshold)),
        ("health_check.unhealthy_threshold", u64::from(health.unhealthy_threshold)),
        ("timeouts.connect_millis", config.timeouts.connect_millis),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if config.api.enabled {
        check_address(&mut errors, "api.bind_address", &config.api.bind_address);
        if config.api.username.is_empty() || config.api.password.is_empty() {
            errors.push(ValidationError::MissingCredentials);
        }
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
