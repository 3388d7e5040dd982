//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, delays ordered)
//! - Check the base URL is an absolute http(s) URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.api.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "api.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("api.base_url", e.to_string())),
    }

    let timeouts = [
        ("api.request_timeout_secs", config.api.request_timeout_secs),
        ("api.process_timeout_secs", config.api.process_timeout_secs),
        ("api.data_timeout_secs", config.api.data_timeout_secs),
        ("api.connect_timeout_secs", config.api.connect_timeout_secs),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    let retries = &config.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::new(
            "retries.max_attempts",
            "must be at least 1",
        ));
    }
    if retries.base_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            format!(
                "{} exceeds retries.max_delay_ms ({})",
                retries.base_delay_ms, retries.max_delay_ms
            ),
        ));
    }
    if !(0.0..=1.0).contains(&retries.jitter_ratio) {
        errors.push(ValidationError::new(
            "retries.jitter_ratio",
            "must be between 0.0 and 1.0",
        ));
    }

    let session = &config.session;
    if session.check_interval_secs == 0 {
        errors.push(ValidationError::new(
            "session.check_interval_secs",
            "must be greater than 0",
        ));
    }
    if session.check_interval_secs > session.inactivity_timeout_secs {
        errors.push(ValidationError::new(
            "session.check_interval_secs",
            "must not exceed session.inactivity_timeout_secs",
        ));
    }
    if session.storage_path.as_os_str().is_empty() {
        errors.push(ValidationError::new(
            "session.storage_path",
            "must not be empty",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
