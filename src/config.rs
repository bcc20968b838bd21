//! Configuration for the store, the asset uploader and the feed.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`SOCIALS_STORE_PATH`, `SOCIALS_ASSET_PATH`,
//!    `SOCIALS_ASSET_BASE_URL`)
//! 2. Config file (TOML)
//! 3. Defaults

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::blobs::AssetConfig;
use crate::error::ConfigError;
use crate::store::StoreConfig;
use crate::subscriptions::SubscriptionConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialsConfig {
    /// Document store location
    #[serde(default)]
    pub store: StoreConfig,

    /// Asset storage and public URL prefix
    #[serde(default)]
    pub assets: AssetConfig,

    /// Feed ordering and error buffering
    #[serde(default)]
    pub feed: SubscriptionConfig,
}

impl SocialsConfig {
    /// Parse a TOML document. Missing sections and keys take defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    ///
    /// Returns default config if file doesn't exist.
    /// Returns error if file exists but is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&content)
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over config file values.
    pub fn with_env(mut self) -> Self {
        if let Some(path) = non_empty_env("SOCIALS_STORE_PATH") {
            self.store.path = PathBuf::from(path);
        }

        if let Some(path) = non_empty_env("SOCIALS_ASSET_PATH") {
            self.assets.path = PathBuf::from(path);
        }

        if let Some(url) = non_empty_env("SOCIALS_ASSET_BASE_URL") {
            self.assets.public_base_url = url;
        }

        self
    }

    /// Check values that parse but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.assets.base_url()?;

        if self.assets.cache_size == 0 {
            return Err(ConfigError::Invalid {
                key: "assets.cache_size",
                reason: "must be at least 1".into(),
            });
        }

        if self.feed.error_buffer == 0 {
            return Err(ConfigError::Invalid {
                key: "feed.error_buffer",
                reason: "must be at least 1".into(),
            });
        }

        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}
