//! # Session-Secret Cache
//!
//! Memoizes the provider's session secret against a fingerprint of the cart
//! so that reloading a page with an unchanged cart does not create a second
//! payment session.
//!
//! Each entry is one JSON record under `<prefix><fingerprint>`:
//!
//! ```text
//! stripe_client_secret_<fp> → {"secret":"pi_..._secret_...","created_at_ms":1700000000000,
//!                              "amount":12.5,"currency":"usd"}
//! ```
//!
//! Any key under the prefix that does not hold such a record (for example the
//! `_timestamp`/`_amount` keys of a half-written older layout) is corrupt and
//! is treated as an expired entry.
//!
//! No operation returns a storage error: failures are logged, `get` degrades
//! to a miss and the mutating operations degrade to no-ops.

use crate::cart::{Cart, CartLine};
use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::money::Currency;
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, warn};

/// Key prefix reserved for cache entries
pub const DEFAULT_KEY_PREFIX: &str = "stripe_client_secret_";

/// Entries older than this are expired
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Fingerprint a cart projection.
///
/// The fingerprint covers `{id, price, quantity}` of each line in the given
/// order plus the total and currency. It is deterministic but deliberately
/// order-sensitive: the same lines in a different order give a different
/// fingerprint.
pub fn fingerprint(lines: &[CartLine], total: f64, currency: Currency) -> String {
    let items: Vec<serde_json::Value> = lines
        .iter()
        .map(|l| {
            serde_json::json!({
                "id": l.id,
                "price": l.price,
                "quantity": l.quantity,
            })
        })
        .collect();

    let canonical = serde_json::json!({
        "items": items,
        "total": total,
        "currency": currency,
    })
    .to_string();

    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// Fingerprint a whole cart
pub fn fingerprint_cart(cart: &Cart) -> String {
    fingerprint(cart.lines(), cart.subtotal(), cart.currency())
}

/// A cached session secret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Opaque secret issued by the payment provider
    pub secret: String,

    /// Creation time, epoch milliseconds
    pub created_at_ms: i64,

    /// Cart amount at creation, major units
    pub amount: f64,

    pub currency: Currency,
}

impl CacheEntry {
    /// True once the entry's age exceeds `ttl`
    pub fn is_expired(&self, now_ms: i64, ttl: Duration) -> bool {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(self.created_at_ms) > ttl_ms
    }
}

/// Counts over all owned entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
}

/// Session-secret cache over an injected key-value store
#[derive(Debug, Clone)]
pub struct SessionSecretCache<S, C = SystemClock> {
    store: S,
    clock: C,
    ttl: Duration,
    prefix: String,
}

impl<S: KeyValueStore> SessionSecretCache<S, SystemClock> {
    /// Create a cache with the default TTL and key prefix
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> SessionSecretCache<S, C> {
    /// Create a cache driven by the given clock
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            ttl: DEFAULT_TTL,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    /// Create a cache configured from `CacheConfig`
    pub fn from_config(store: S, clock: C, config: &CacheConfig) -> Self {
        Self::with_clock(store, clock)
            .with_ttl(config.ttl())
            .with_prefix(config.key_prefix.clone())
    }

    /// Builder: set TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Builder: set the reserved key prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Storage key for a fingerprint
    pub fn key(&self, fingerprint: &str) -> String {
        format!("{}{}", self.prefix, fingerprint)
    }

    /// Cached secret for `fingerprint`, if present and not expired.
    /// Expired or corrupt entries are removed.
    pub fn get(&self, fingerprint: &str) -> Option<String> {
        self.entry(fingerprint).map(|e| e.secret)
    }

    /// Full cached record for `fingerprint`, with the same eviction as `get`
    pub fn entry(&self, fingerprint: &str) -> Option<CacheEntry> {
        let key = self.key(fingerprint);

        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Session cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if !entry.is_expired(self.clock.now_ms(), self.ttl) => Some(entry),
            Ok(_) => {
                debug!("Evicting expired session secret {}", key);
                self.remove_key(&key);
                None
            }
            Err(e) => {
                warn!("Evicting corrupt session cache entry {}: {}", key, e);
                self.remove_key(&key);
                None
            }
        }
    }

    /// Store a secret, overwriting any entry for the fingerprint
    pub fn put(&self, fingerprint: &str, secret: &str, amount: f64, currency: Currency) {
        let key = self.key(fingerprint);
        let entry = CacheEntry {
            secret: secret.to_string(),
            created_at_ms: self.clock.now_ms(),
            amount,
            currency,
        };

        let result = serde_json::to_string(&entry)
            .map_err(|e| e.to_string())
            .and_then(|json| self.store.set(&key, &json).map_err(|e| e.to_string()));

        match result {
            Ok(()) => debug!("Cached session secret {}", key),
            Err(e) => warn!("Session cache write failed for {}: {}", key, e),
        }
    }

    /// Remove every expired or corrupt entry. Returns the number removed.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;

        for key in self.owned_keys() {
            let expired = match self.store.get(&key) {
                Ok(Some(raw)) => self.is_stale(&raw, now),
                Ok(None) => false,
                Err(e) => {
                    warn!("Session cache read failed for {}: {}", key, e);
                    false
                }
            };

            if expired && self.remove_key(&key) {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!("Evicted {} expired session secrets", removed);
        }
        removed
    }

    /// Remove every owned entry regardless of age. Returns the number removed.
    pub fn evict_all(&self) -> usize {
        let removed = self
            .owned_keys()
            .iter()
            .filter(|key| self.remove_key(key))
            .count();

        debug!("Cleared {} session cache keys", removed);
        removed
    }

    /// Count entries by validity without modifying storage
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_ms();
        let mut stats = CacheStats::default();

        for key in self.owned_keys() {
            let raw = match self.store.get(&key) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Session cache read failed for {}: {}", key, e);
                    continue;
                }
            };

            stats.total += 1;
            if self.is_stale(&raw, now) {
                stats.expired += 1;
            } else {
                stats.valid += 1;
            }
        }

        stats
    }

    fn is_stale(&self, raw: &str, now_ms: i64) -> bool {
        serde_json::from_str::<CacheEntry>(raw)
            .map(|entry| entry.is_expired(now_ms, self.ttl))
            .unwrap_or(true)
    }

    fn owned_keys(&self) -> Vec<String> {
        self.store
            .keys_with_prefix(&self.prefix)
            .unwrap_or_else(|e| {
                warn!("Session cache key listing failed: {}", e);
                Vec::new()
            })
    }

    fn remove_key(&self, key: &str) -> bool {
        match self.store.remove(key) {
            Ok(()) => true,
            Err(e) => {
                warn!("Session cache delete failed for {}: {}", key, e);
                false
            }
        }
    }
}
