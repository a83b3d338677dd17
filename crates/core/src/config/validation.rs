//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Largest page a single window read may request.
const MAX_PAGE_SIZE: u64 = 1_000_000;

/// Longest metadata TTL accepted: 100 years.
pub(crate) const MAX_TTL_HOURS: u64 = 100 * 365 * 24;

/// Upper bound on the throttle gate; a larger value defeats the purpose of the gate.
const MAX_THROTTLE_CAPACITY: usize = 64;

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

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `page_size` is 0 or exceeds 1,000,000
    /// - `ttl_hours` exceeds 100 years
    /// - `ttl_hours`, `max_artifact_bytes`, `reclaim_every_pages` or `max_display_chars` is 0
    /// - `throttle_capacity` is 0 or exceeds 64
    /// - `command_timeout_ms` is less than 100ms or exceeds 10 minutes
    ///
    /// Returns `ConfigError::Missing` if `environment` or `database` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid { field: "page_size".into(), reason: "must be greater than 0".into() });
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Invalid {
                field: "page_size".into(),
                reason: format!("must not exceed {MAX_PAGE_SIZE}"),
            });
        }

        if self.ttl_hours == 0 {
            return Err(ConfigError::Invalid { field: "ttl_hours".into(), reason: "must be greater than 0".into() });
        }
        if self.ttl_hours > MAX_TTL_HOURS {
            return Err(ConfigError::Invalid {
                field: "ttl_hours".into(),
                reason: format!("must not exceed {MAX_TTL_HOURS}"),
            });
        }

        if self.max_artifact_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_artifact_bytes".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.throttle_capacity == 0 || self.throttle_capacity > MAX_THROTTLE_CAPACITY {
            return Err(ConfigError::Invalid {
                field: "throttle_capacity".into(),
                reason: format!("must be between 1 and {MAX_THROTTLE_CAPACITY}"),
            });
        }

        if self.reclaim_every_pages == 0 {
            return Err(ConfigError::Invalid {
                field: "reclaim_every_pages".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.command_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "command_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.command_timeout_ms > 600_000 {
            return Err(ConfigError::Invalid {
                field: "command_timeout_ms".into(),
                reason: "must not exceed 10 minutes (600000ms)".into(),
            });
        }

        if self.max_display_chars == 0 {
            return Err(ConfigError::Invalid {
                field: "max_display_chars".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.environment.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "environment".into(),
                hint: "Set TABSCAN_ENVIRONMENT environment variable".into(),
            });
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "database".into(),
                hint: "Set TABSCAN_DATABASE environment variable".into(),
            });
        }

        if self.pacing_ms == 0 {
            tracing::warn!("pacing_ms is 0; source dispatches will not be paced");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_page_size_zero() {
        let config = AppConfig { page_size: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "page_size"));
    }

    #[test]
    fn test_validate_page_size_exceeds_limit() {
        let config = AppConfig { page_size: MAX_PAGE_SIZE + 1, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "page_size"));
    }

    #[test]
    fn test_validate_ttl_exceeds_limit() {
        let config = AppConfig { ttl_hours: 10_000_000_000_000, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "ttl_hours"));

        let config = AppConfig { ttl_hours: MAX_TTL_HOURS + 1, ..Default::default() };
        assert!(config.validate().is_err());

        let config = AppConfig { ttl_hours: MAX_TTL_HOURS, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_throttle_capacity_bounds() {
        let config = AppConfig { throttle_capacity: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "throttle_capacity"));

        let config = AppConfig { throttle_capacity: 65, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "throttle_capacity"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { command_timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "command_timeout_ms"));
    }

    #[test]
    fn test_validate_empty_environment() {
        let config = AppConfig { environment: "  ".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "environment"));
    }

    #[test]
    fn test_validate_zero_pacing_is_allowed() {
        let config = AppConfig { pacing_ms: 0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig {
            page_size: 1,
            throttle_capacity: 1,
            command_timeout_ms: 100,
            ttl_hours: 1,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_values() {
        let config = AppConfig {
            page_size: MAX_PAGE_SIZE,
            throttle_capacity: MAX_THROTTLE_CAPACITY,
            command_timeout_ms: 600_000,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
