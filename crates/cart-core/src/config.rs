//! # Cache Configuration
//!
//! Loaded from the `[cache]` table of `config/checkout.toml`:
//!
//! ```toml
//! [cache]
//! ttl_secs = 1800
//! sweep_interval_secs = 300
//! key_prefix = "stripe_client_secret_"
//! cart_key = "cart"
//! ```

use crate::cache::{DEFAULT_KEY_PREFIX, DEFAULT_TTL};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session cache and cart storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry time-to-live in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Interval of the background expiry sweep in seconds (0 disables it)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Reserved prefix for cache entry keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Storage key of the persisted cart snapshot
    #[serde(default = "default_cart_key")]
    pub cart_key: String,
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_cart_key() -> String {
    "cart".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            key_prefix: default_key_prefix(),
            cart_key: default_cart_key(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    cache: CacheConfig,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// `None` when the background sweep is disabled
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    /// Load from a TOML document containing a `[cache]` table.
    /// A missing table yields the defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<ConfigFile>(toml_str).map(|file| file.cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl(), Duration::from_secs(1800));
        assert_eq!(config.key_prefix, "stripe_client_secret_");
        assert_eq!(config.cart_key, "cart");
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = CacheConfig::from_toml(
            r#"
            [cache]
            ttl_secs = 60
            sweep_interval_secs = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.ttl_secs, 60);
        assert_eq!(config.sweep_interval(), None);
        assert_eq!(config.key_prefix, "stripe_client_secret_");
    }

    #[test]
    fn test_from_toml_without_table() {
        assert_eq!(CacheConfig::from_toml("").unwrap(), CacheConfig::default());
    }

    #[test]
    fn test_from_toml_rejects_bad_types() {
        assert!(CacheConfig::from_toml("[cache]\nttl_secs = \"soon\"").is_err());
    }
}
