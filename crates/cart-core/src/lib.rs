//! # cart-core
//!
//! Cart aggregation and session-secret caching for checkout-cache.
//!
//! This crate provides:
//! - `Cart` and `PersistentCart` for merge-by-id line items with derived totals
//! - `SessionSecretCache` for memoizing provider session secrets per cart
//! - `KeyValueStore` port and the in-memory `MemoryStore`
//! - `Clock` port with `SystemClock` and `ManualClock`
//! - `SessionProvider` trait and `resolve_session` cache-aside flow
//! - `StorageError` and `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use cart_core::{CartLine, MemoryStore, PersistentCart, SessionSecretCache, fingerprint_cart};
//!
//! let store = MemoryStore::new();
//! let mut cart = PersistentCart::load(store.clone(), "cart");
//! cart.add_line(CartLine::new("tee", "T-Shirt", 29.99, 1));
//!
//! let cache = SessionSecretCache::new(store);
//! let fp = fingerprint_cart(cart.cart());
//! if cache.get(&fp).is_none() {
//!     let secret = create_payment_intent(cart.cart()).await?;
//!     cache.put(&fp, &secret, cart.cart().subtotal(), cart.cart().currency());
//! }
//! ```

pub mod cache;
pub mod cart;
pub mod clock;
pub mod config;
pub mod error;
pub mod money;
pub mod provider;
pub mod storage;

// Re-exports for convenience
pub use cache::{
    fingerprint, fingerprint_cart, CacheEntry, CacheStats, SessionSecretCache, DEFAULT_KEY_PREFIX,
    DEFAULT_TTL,
};
pub use cart::{Cart, CartLine, PersistentCart, SnapshotError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use error::{PaymentError, PaymentResult, StorageError, StorageResult};
pub use money::{Currency, Price, UnsupportedCurrency};
pub use provider::{
    resolve_session, scoped_fingerprint, BoxedSessionProvider, ProviderSession, ResolvedSession,
    SessionProvider, SessionRequest,
};
pub use storage::{KeyValueStore, MemoryStore};
