//! Authorization state configuration loading and validation

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete authorization state configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthzConfig {
    /// Trust the store for snapshot reads instead of taking the roles lock
    #[serde(default)]
    pub lock_free_reads: bool,

    /// Schema version reported when no version document is stored
    #[serde(default = "default_auth_schema_version")]
    pub default_auth_schema_version: i32,

    #[serde(default)]
    pub user_cache: UserCacheConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserCacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_auth_schema_version() -> i32 { 5 }
fn default_cache_capacity() -> usize { 10_000 }
fn default_cache_ttl() -> u64 { 60 }

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            lock_free_reads: false,
            default_auth_schema_version: default_auth_schema_version(),
            user_cache: UserCacheConfig::default(),
        }
    }
}

impl Default for UserCacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

impl UserCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl AuthzConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AuthzConfig = toml::from_str(contents)
            .map_err(|e| AuthzError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.user_cache.capacity == 0 {
            return Err(AuthzError::Config(
                "user_cache.capacity must be greater than zero".to_string(),
            ));
        }

        if self.default_auth_schema_version < 0 {
            return Err(AuthzError::Config(format!(
                "default_auth_schema_version must not be negative, got {}",
                self.default_auth_schema_version
            )));
        }

        Ok(())
    }
}
