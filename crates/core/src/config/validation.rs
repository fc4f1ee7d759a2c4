//! Configuration validation rules.

use crate::config::CacheConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl CacheConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `max_redirects` exceeds 20
    /// - `user_agent` is empty
    /// - `cache_buster_param` is empty or contains `&`, `=` or `#`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.max_redirects > 20 {
            return Err(ConfigError::Invalid { field: "max_redirects".into(), reason: "must not exceed 20".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.cache_buster_param.is_empty() {
            return Err(ConfigError::Invalid { field: "cache_buster_param".into(), reason: "must not be empty".into() });
        }
        if self.cache_buster_param.contains(['&', '=', '#']) {
            return Err(ConfigError::Invalid {
                field: "cache_buster_param".into(),
                reason: "must not contain '&', '=' or '#'".into(),
            });
        }

        if !self.persistent && self.kv_path != CacheConfig::default().kv_path {
            tracing::warn!(
                kv_path = %self.kv_path.display(),
                "kv_path is set but persistence is disabled; entries will stay in memory"
            );
        }

        Ok(())
    }
}
