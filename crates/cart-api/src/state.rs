//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the session provider, the session-secret cache and configuration.

use cart_core::{BoxedSessionProvider, CacheConfig, MemoryStore, SessionSecretCache, SystemClock};
use cart_stripe::StripeIntentProvider;
use std::net::SocketAddr;
use std::sync::Arc;

/// Session cache as used by the service
pub type ServiceCache = SessionSecretCache<MemoryStore, SystemClock>;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            environment: "development".to_string(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment session provider
    pub provider: BoxedSessionProvider,
    /// Session-secret cache
    pub cache: Arc<ServiceCache>,
    /// Cache settings
    pub cache_config: CacheConfig,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState with the Stripe provider
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let cache_config = load_cache_config()?;

        let stripe = StripeIntentProvider::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;

        Ok(Self::with_provider(
            Arc::new(stripe),
            MemoryStore::new(),
            cache_config,
            config,
        ))
    }

    /// Create state around an explicit provider and store
    pub fn with_provider(
        provider: BoxedSessionProvider,
        store: MemoryStore,
        cache_config: CacheConfig,
        config: AppConfig,
    ) -> Self {
        let cache = SessionSecretCache::from_config(store, SystemClock, &cache_config);

        Self {
            provider,
            cache: Arc::new(cache),
            cache_config,
            config,
        }
    }
}

/// Load cache settings from `config/checkout.toml`, then apply env overrides
fn load_cache_config() -> anyhow::Result<CacheConfig> {
    let config_paths = [
        "config/checkout.toml",
        "../config/checkout.toml",
        "../../config/checkout.toml",
    ];

    let mut config = None;
    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let parsed = CacheConfig::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded cache config from {}", path);
            config = Some(parsed);
            break;
        }
    }

    let mut config = config.unwrap_or_else(|| {
        tracing::info!("No checkout.toml found, using default cache config");
        CacheConfig::default()
    });

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

fn apply_env_overrides(
    config: &mut CacheConfig,
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(ttl) = var("CACHE_TTL_SECS") {
        config.ttl_secs = ttl
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid CACHE_TTL_SECS {:?}: {}", ttl, e))?;
    }
    if let Some(interval) = var("CACHE_SWEEP_INTERVAL_SECS") {
        config.sweep_interval_secs = interval
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid CACHE_SWEEP_INTERVAL_SECS {:?}: {}", interval, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "test".to_string(),
        };

        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
        assert!(!config.is_production());
    }

    #[test]
    fn test_invalid_socket_addr() {
        let config = AppConfig {
            host: "not a host".to_string(),
            ..AppConfig::default()
        };
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> =
            [("CACHE_TTL_SECS", "60"), ("CACHE_SWEEP_INTERVAL_SECS", "0")].into();
        let mut config = CacheConfig::default();

        apply_env_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.ttl_secs, 60);
        assert_eq!(config.sweep_interval(), None);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = CacheConfig::default();
        let result = apply_env_overrides(&mut config, |k| {
            (k == "CACHE_TTL_SECS").then(|| "half an hour".to_string())
        });
        assert!(result.is_err());
        assert_eq!(config.ttl_secs, 1800);
    }
}
