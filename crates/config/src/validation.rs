//! Configuration validation

use crate::{AppConfig, ConfigError, ConfirmationSettings, Result};

/// Upper bound on manual checks per confirmation attempt
pub const MAX_CHECKS_LIMIT: u32 = 10;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire application configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let mut errors = validate_confirmation(&config.confirmation);

    if let Err(e) = validate_log_level(&config.logging.level) {
        errors.push(e);
    }

    if let Err(e) = validate_metric_namespace(&config.metrics.namespace) {
        errors.push(ValidationError::new("metrics.namespace", e));
    }

    // Return all errors if any were found
    if !errors.is_empty() {
        let error_msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ConfigError::ValidationError(error_msg));
    }

    Ok(())
}

/// Validate confirmation timing
pub fn validate_confirmation(settings: &ConfirmationSettings) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if settings.first_check_delay_ms == 0 {
        errors.push(ValidationError::new(
            "confirmation.first_check_delay_ms",
            "must be greater than 0",
        ));
    }

    if settings.retry_delay_ms == 0 {
        errors.push(ValidationError::new(
            "confirmation.retry_delay_ms",
            "must be greater than 0",
        ));
    }

    if settings.retry_delay_ms > settings.first_check_delay_ms {
        errors.push(ValidationError::new(
            "confirmation.retry_delay_ms",
            "must not exceed first_check_delay_ms",
        ));
    }

    if settings.max_checks == 0 || settings.max_checks > MAX_CHECKS_LIMIT {
        errors.push(ValidationError::new(
            "confirmation.max_checks",
            format!("must be between 1 and {MAX_CHECKS_LIMIT}"),
        ));
    }

    if settings.query_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "confirmation.query_timeout_ms",
            "must be greater than 0",
        ));
    }

    if settings.backoff_multiplier.is_nan() || settings.backoff_multiplier < 1.0 {
        errors.push(ValidationError::new(
            "confirmation.backoff_multiplier",
            "must be >= 1.0",
        ));
    }

    errors
}

/// Validate a Prometheus metric name prefix
pub fn validate_metric_namespace(namespace: &str) -> std::result::Result<(), String> {
    let mut chars = namespace.chars();
    let Some(first) = chars.next() else {
        return Err("namespace cannot be empty".to_string());
    };

    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err("namespace must start with a letter or underscore".to_string());
    }

    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("namespace may only contain letters, digits and underscores".to_string());
    }

    Ok(())
}

/// Validate log level
fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new(
            "logging.level",
            format!(
                "invalid log level '{level}', must be one of: trace, debug, info, warn, error"
            ),
        )),
    }
}
