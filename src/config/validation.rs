//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (fee limit > 0, poll limit > 0, delays ordered)
//! - Check the gateway URL is usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::config::schema::ClientConfig;
use crate::resilience::BackoffStrategy;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
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

/// Check a parsed configuration.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(gateway) = &config.gateway {
        if gateway.url.trim().is_empty() {
            errors.push(ValidationError::new("gateway.url", "must not be empty"));
        } else if let Err(e) = url::Url::parse(&gateway.url) {
            errors.push(ValidationError::new("gateway.url", format!("invalid URL: {}", e)));
        }
    }

    if config.transactions.fee_limit <= 0 {
        errors.push(ValidationError::new("transactions.fee_limit", "must be greater than zero"));
    }

    let retries = &config.retries;
    if retries.strategy == BackoffStrategy::Exponential && retries.delay_ms == 0 {
        errors.push(ValidationError::new(
            "retries.delay_ms",
            "must be greater than zero for the exponential strategy",
        ));
    }
    if retries.max_delay_ms < retries.delay_ms {
        errors.push(ValidationError::new(
            "retries.max_delay_ms",
            format!("must not be less than delay_ms ({})", retries.delay_ms),
        ));
    }
    if retries.receipt_poll_limit == 0 {
        errors.push(ValidationError::new("retries.receipt_poll_limit", "must be at least 1"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
