//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("server.path must start and end with '/', got '{0}'")]
    InvalidPath(String),
    #[error("server.metrics_path must start with '/' and differ from server.path, got '{0}'")]
    InvalidMetricsPath(String),
    #[error("transport.{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("transport.max_payload_bytes must be greater than zero")]
    ZeroPayloadLimit,
    #[error("at least one of transport.polling and transport.websocket must be enabled")]
    NoTransports,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    let path = &config.server.path;
    if !path.starts_with('/') || !path.ends_with('/') {
        errors.push(ValidationError::InvalidPath(path.clone()));
    }
    if let Some(ref metrics_path) = config.server.metrics_path
        && (!metrics_path.starts_with('/') || metrics_path == path)
    {
        errors.push(ValidationError::InvalidMetricsPath(metrics_path.clone()));
    }

    let transport = &config.transport;
    for (name, value) in [
        ("ping_interval_ms", transport.ping_interval_ms),
        ("ping_timeout_ms", transport.ping_timeout_ms),
        ("upgrade_timeout_ms", transport.upgrade_timeout_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration(name));
        }
    }
    if transport.max_payload_bytes == 0 {
        errors.push(ValidationError::ZeroPayloadLimit);
    }
    if !transport.polling && !transport.websocket {
        errors.push(ValidationError::NoTransports);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_valid_config() -> String {
        r#"
[server]
name = "test.server"

[listen]
address = "127.0.0.1:8080"
"#
        .to_string()
    }

    #[test]
    fn test_valid_config_passes() {
        let config: Config = toml::from_str(&minimal_valid_config()).unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_server_name_fails() {
        let toml = r#"
[server]
name = ""

[listen]
address = "127.0.0.1:8080"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingServerName)));
    }

    #[test]
    fn test_bad_paths_fail() {
        let toml = r#"
[server]
path = "socket.io"
metrics_path = "metrics"

[listen]
address = "127.0.0.1:8080"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidPath(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidMetricsPath(_))));
    }

    #[test]
    fn test_all_errors_are_collected() {
        let toml = r#"
[listen]
address = "127.0.0.1:8080"

[transport]
ping_interval_ms = 0
upgrade_timeout_ms = 0
max_payload_bytes = 0
polling = false
websocket = false
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::NoTransports)));
        assert_eq!(
            errors[0].to_string(),
            "transport.ping_interval_ms must be greater than zero"
        );
    }
}
