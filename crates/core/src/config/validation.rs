//! Configuration validation rules.
//!
//! Checks `AppConfig` values after they have been loaded from
//! environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

const MAX_BYTES_CEILING: usize = 50 * 1024 * 1024;
const TIMEOUT_RANGE_MS: std::ops::RangeInclusive<u64> = 100..=300_000;

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is outside 100ms to 5 minutes
    /// - `user_agent` or `bind_addr` is blank
    /// - `read_later_limit` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.max_bytes {
            0 => return Err(invalid("max_bytes", "must be greater than 0")),
            n if n > MAX_BYTES_CEILING => return Err(invalid("max_bytes", "must not exceed 50MB")),
            _ => {}
        }

        if !TIMEOUT_RANGE_MS.contains(&self.timeout_ms) {
            return Err(invalid("timeout_ms", "must be between 100ms and 5 minutes (300000ms)"));
        }

        for (field, value) in [("user_agent", &self.user_agent), ("bind_addr", &self.bind_addr)] {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
        }

        if self.read_later_limit == 0 {
            return Err(invalid("read_later_limit", "must keep at least one item"));
        }

        if self.require_add_key().is_err() {
            tracing::warn!("add_key is not set; gated endpoints will reject every request");
        }

        Ok(())
    }
}
