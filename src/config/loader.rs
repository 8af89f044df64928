//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;

    const SAMPLE: &str = r#"
        [listener]
        bind_address = "127.0.0.1:3306"

        [[backends]]
        name = "backend-0"
        host = "10.0.0.1"
        port = 3306
        healthcheck_port = 9200

        [[backends]]
        name = "backend-1"
        host = "10.0.0.2"
        port = 3306
        healthcheck_port = 9200

        [health_check]
        timeout_millis = 250

        [api]
        bind_address = "127.0.0.1:8080"
        username = "admin"
        password = "secret"

        [observability]
        log_format = "json"
    "#;

    #[test]
    fn parses_sample_with_defaults() {
        let config = parse_config(SAMPLE).unwrap();

        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.backends[1].name, "backend-1");
        assert_eq!(config.health_check.timeout_millis, 250);
        assert_eq!(config.health_check.interval_millis, 1_000);
        assert_eq!(config.listener.max_connections, 10_000);
        assert_eq!(config.timeouts.connect_millis, 5_000);
        assert_eq!(config.api.username, "admin");
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = parse_config("[[backends]\nname = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn reports_validation_errors() {
        let err = parse_config("[api]\nusername = \"u\"\npassword = \"p\"\n").unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert!(errors.contains(&ValidationError::NoBackends));
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join(format!("failover-proxy-{}.toml", std::process::id()));
        fs::write(&path, SAMPLE).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:3306");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/failover-proxy.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
