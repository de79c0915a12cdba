//! Configuration validation
//!
//! Rules:
//! - field-level constraints (host non-empty, queue_capacity > 0)
//! - fanout and notify ports must differ
//! - job_max_age must be a parseable duration string
//! - allow-list entries must be non-empty
//! - at least one role enabled

use contracts::{QueueConfig, QueueError};
use validator::Validate;

/// Validate a QueueConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &QueueConfig) -> Result<(), QueueError> {
    validate_fields(config)?;
    validate_roles(config)?;
    validate_ports(config)?;
    validate_max_age(config)?;
    validate_handlers(config)?;
    Ok(())
}

/// Field-level constraints via the derive
fn validate_fields(config: &QueueConfig) -> Result<(), QueueError> {
    config.validate().map_err(|e| {
        let field = e
            .field_errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "config".to_string());
        QueueError::config_validation(field, e.to_string())
    })
}

/// At least one of the two roles must be active
fn validate_roles(config: &QueueConfig) -> Result<(), QueueError> {
    if !config.manager && !config.effective_worker() {
        return Err(QueueError::config_validation(
            "manager",
            "neither manager nor worker role is enabled",
        ));
    }
    Ok(())
}

/// Fanout and notify cannot share a port
fn validate_ports(config: &QueueConfig) -> Result<(), QueueError> {
    if config.notify_port == Some(config.port) {
        return Err(QueueError::config_validation(
            "notify_port",
            format!("notify_port must differ from port ({})", config.port),
        ));
    }
    Ok(())
}

/// The reaper hint must parse
fn validate_max_age(config: &QueueConfig) -> Result<(), QueueError> {
    config.job_max_age()?;
    Ok(())
}

/// Allow-list entries must be usable capability names
fn validate_handlers(config: &QueueConfig) -> Result<(), QueueError> {
    if let Some(handlers) = &config.handlers {
        for (i, name) in handlers.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(QueueError::config_validation(
                    format!("handlers[{i}]"),
                    "handler name must not be empty",
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&QueueConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_host_rejected() {
        let config = QueueConfig {
            host: String::new(),
            ..Default::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("host"));
    }

    #[test]
    fn test_zero_queue_capacity_rejected() {
        let config = QueueConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_no_roles_rejected() {
        let config = QueueConfig {
            manager: false,
            worker: false,
            ..Default::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_applet_only_worker_rejected() {
        // Applet mode disables the worker; with the manager off nothing is left
        let config = QueueConfig {
            manager: false,
            applet: true,
            ..Default::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_duration_rejected() {
        let config = QueueConfig {
            job_max_age: "sometime".to_string(),
            ..Default::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("job_max_age"));
    }

    #[test]
    fn test_empty_handler_name_rejected() {
        let config = QueueConfig {
            handlers: Some(vec!["echo".to_string(), "  ".to_string()]),
            ..Default::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("handlers[1]"));
    }
}
