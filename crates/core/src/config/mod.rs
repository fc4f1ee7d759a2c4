//! Cache configuration with layered loading.
//!
//! Configuration is assembled with figment from, in increasing precedence:
//!
//! 1. Built-in defaults
//! 2. TOML config file (if CACHEFIRST_CONFIG_FILE set)
//! 3. Environment variables (CACHEFIRST_*)

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Cache and transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether persistent tiers are available in this environment.
    ///
    /// When false, every entry lives in process memory only.
    /// Set via CACHEFIRST_PERSISTENT environment variable.
    #[serde(default = "default_true")]
    pub persistent: bool,

    /// Path to the small-value store (JSON file).
    ///
    /// Set via CACHEFIRST_KV_PATH environment variable.
    #[serde(default = "default_kv_path")]
    pub kv_path: PathBuf,

    /// Path to the SQLite database backing the large-value tier.
    ///
    /// Set via CACHEFIRST_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Query parameter carrying the cache-defeating timestamp.
    #[serde(default = "default_cache_buster_param")]
    pub cache_buster_param: String,
}

fn default_true() -> bool {
    true
}

fn default_kv_path() -> PathBuf {
    PathBuf::from("./cachefirst-kv.json")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./cachefirst-cache.sqlite")
}

fn default_user_agent() -> String {
    "cachefirst/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_redirects() -> usize {
    5
}

fn default_cache_buster_param() -> String {
    "userLocalTime".into()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            persistent: true,
            kv_path: default_kv_path(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
            cache_buster_param: default_cache_buster_param(),
        }
    }
}

impl CacheConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CACHEFIRST_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        Self::extract(figment.merge(Env::prefixed("CACHEFIRST_").map(|key| key.as_str().to_lowercase().into())))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert!(config.persistent);
        assert_eq!(config.kv_path, PathBuf::from("./cachefirst-kv.json"));
        assert_eq!(config.db_path, PathBuf::from("./cachefirst-cache.sqlite"));
        assert_eq!(config.user_agent, "cachefirst/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.cache_buster_param, "userLocalTime");
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        let figment = Figment::from(Serialized::defaults(CacheConfig::default())).merge(Toml::string(
            r#"
            persistent = false
            cache_buster_param = "_ts"
            "#,
        ));

        let config = CacheConfig::extract(figment).unwrap();
        assert!(!config.persistent);
        assert_eq!(config.cache_buster_param, "_ts");
        assert_eq!(config.user_agent, "cachefirst/0.1");
    }

    #[test]
    fn test_extract_rejects_invalid_values() {
        let figment = Figment::from(Serialized::defaults(CacheConfig::default())).merge(Toml::string("max_bytes = 0"));
        assert!(matches!(CacheConfig::extract(figment), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_extract_reports_type_errors() {
        let figment =
            Figment::from(Serialized::defaults(CacheConfig::default())).merge(Toml::string("persistent = \"maybe\""));
        assert!(matches!(CacheConfig::extract(figment), Err(ConfigError::LoadFailed(_))));
    }
}
