//! Configuration management for Herdbook.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `herdbook.toml` file
//! 3. User config `~/.config/herdbook/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::levels::SexConsistency;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend API configuration.
    pub api: ApiConfig,

    /// Tree building configuration.
    pub genealogy: GenealogyConfig,

    /// Tree cache configuration.
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./herdbook.toml` (project local)
    /// 2. `~/.config/herdbook/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_file(DEFAULT_CONFIG_FILE);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(DEFAULT_CONFIG_APP_DIR).join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // API overrides
        if let Ok(url) = std::env::var("HERDBOOK_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(token) = std::env::var("HERDBOOK_API_TOKEN") {
            self.api.token = Some(token);
        }
        if let Ok(secs) = std::env::var("HERDBOOK_TIMEOUT_SECS") {
            if let Ok(n) = secs.parse() {
                self.api.timeout_secs = n;
            }
        }

        // Genealogy overrides
        if let Ok(depth) = std::env::var("HERDBOOK_MAX_DEPTH") {
            if let Ok(n) = depth.parse() {
                self.genealogy.default_max_depth = n;
            }
        }

        // Cache overrides
        if let Ok(secs) = std::env::var("HERDBOOK_CACHE_TTL_SECS") {
            if let Ok(n) = secs.parse() {
                self.cache.ttl_secs = n;
            }
        }
        if let Ok(dir) = std::env::var("HERDBOOK_CACHE_DIR") {
            self.cache.dir = Some(dir);
        }
    }

    /// Rejects values the genealogy core cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url is empty".to_string()));
        }
        if self.genealogy.fallback_depth == 0 {
            return Err(ConfigError::Invalid(
                "genealogy.fallback_depth must be at least 1".to_string(),
            ));
        }
        if self.genealogy.load_more_increment == 0 {
            return Err(ConfigError::Invalid(
                "genealogy.load_more_increment must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Backend API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the REST backend.
    pub base_url: String,

    /// Bearer token (can also be set via environment variable).
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Page size used when listing the herd.
    pub page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None, // Load from env
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Tree building configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenealogyConfig {
    /// Generations requested when the caller does not say.
    pub default_max_depth: usize,

    /// Depth assumed when a server graph declares `depth <= 0`.
    pub fallback_depth: usize,

    /// Generations added by one "load more".
    pub load_more_increment: usize,

    /// Comma-separated node fields requested from the server.
    pub default_fields: String,

    /// When to drop parents whose recorded sex contradicts their role.
    pub sex_consistency: SexConsistency,
}

impl Default for GenealogyConfig {
    fn default() -> Self {
        Self {
            default_max_depth: DEFAULT_MAX_DEPTH,
            fallback_depth: DEFAULT_FALLBACK_DEPTH,
            load_more_increment: DEFAULT_LOAD_MORE_INCREMENT,
            default_fields: DEFAULT_TREE_FIELDS.to_string(),
            sex_consistency: SexConsistency::default(),
        }
    }
}

/// Tree cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry time-to-live in seconds.
    pub ttl_secs: u64,

    /// Whether entries are also written to disk.
    pub persist: bool,

    /// Cache directory. Defaults to the platform cache dir.
    pub dir: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            persist: true,
            dir: None, // Use platform default
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Resolved cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        match &self.dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::cache_dir()
                .map(|dir| dir.join(DEFAULT_CACHE_SUBDIR))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, DEFAULT_API_URL);
        assert_eq!(config.genealogy.fallback_depth, 10);
        assert_eq!(config.genealogy.load_more_increment, 2);
        assert_eq!(config.cache.ttl(), Duration::from_secs(480));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_to_toml() {
        let toml_str = Config::default_config_string();
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[genealogy]"));
        assert!(toml_str.contains("[cache]"));
        assert!(!toml_str.contains("token"));
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[api]
base_url = "https://finca.example.com/api"

[genealogy]
fallback_depth = 6
sex_consistency = "always"

[cache]
ttl_secs = 60
dir = "/tmp/herdbook"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.base_url, "https://finca.example.com/api");
        assert_eq!(config.api.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.genealogy.fallback_depth, 6);
        assert_eq!(config.genealogy.sex_consistency, SexConsistency::Always);
        assert_eq!(config.cache.cache_dir(), PathBuf::from("/tmp/herdbook"));
    }

    #[test]
    fn test_validate_rejects_zero_increment() {
        let mut config = Config::default();
        config.genealogy.load_more_increment = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
