//! # cart-wasm
//!
//! WebAssembly bindings for checkout-cache-rs.
//!
//! This crate provides:
//! - A cart persisted in `localStorage`
//! - The session-secret cache over `sessionStorage`
//! - Small display and validation helpers
//!
//! When Web Storage is unavailable (private browsing, storage disabled) both
//! fall back to an in-memory store for the lifetime of the page.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmCart, WasmSessionCache } from 'checkout-cache-wasm';
//!
//! await init();
//!
//! const cart = new WasmCart();
//! cart.addLine('1', 'One', 1.0, 1);
//!
//! const cache = new WasmSessionCache();
//! let secret = cache.get(cart.fingerprint());
//! if (!secret) {
//!   secret = await fetchPaymentSession(cart.items());
//!   cache.put(cart.fingerprint(), secret, cart.subtotal(), 'usd');
//! }
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

pub mod storage;

use cart_core::{
    fingerprint_cart, CacheConfig, CartLine, Currency, PersistentCart, Price, SessionSecretCache,
};
use wasm_bindgen::prelude::*;

pub use storage::{BrowserStorage, JsClock, PageStorage, StorageArea};

fn clamp_count(n: i64) -> u32 {
    u32::try_from(n.max(0)).unwrap_or(u32::MAX)
}

fn parse_currency(code: &str) -> Result<Currency, JsValue> {
    code.parse::<Currency>()
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Cart persisted to `localStorage`
#[wasm_bindgen]
pub struct WasmCart {
    inner: PersistentCart<PageStorage>,
}

#[wasm_bindgen]
impl WasmCart {
    /// Load the cart stored under the default key
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmCart {
        WasmCart::with_key(&CacheConfig::default().cart_key)
    }

    /// Load the cart stored under `key`
    #[wasm_bindgen(js_name = withKey)]
    pub fn with_key(key: &str) -> WasmCart {
        let store = PageStorage::open_or_memory(StorageArea::Local);
        Self {
            inner: PersistentCart::load(store, key),
        }
    }

    /// Cart that is never written to Web Storage
    #[wasm_bindgen(js_name = inMemory)]
    pub fn in_memory() -> WasmCart {
        Self {
            inner: PersistentCart::load(PageStorage::Memory(Default::default()), "cart"),
        }
    }

    #[wasm_bindgen(js_name = addLine)]
    pub fn add_line(&mut self, id: String, name: String, price: f64, quantity: i32) {
        self.inner
            .add_line(CartLine::new(id, name, price, i64::from(quantity)));
    }

    #[wasm_bindgen(js_name = updateQuantity)]
    pub fn update_quantity(&mut self, id: &str, quantity: i32) {
        self.inner.update_quantity(id, i64::from(quantity));
    }

    #[wasm_bindgen(js_name = removeLine)]
    pub fn remove_line(&mut self, id: &str) {
        self.inner.remove_line(id);
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn subtotal(&self) -> f64 {
        self.inner.cart().subtotal()
    }

    #[wasm_bindgen(js_name = itemCount)]
    pub fn item_count(&self) -> u32 {
        clamp_count(self.inner.cart().item_count())
    }

    #[wasm_bindgen(js_name = isEmpty)]
    pub fn is_empty(&self) -> bool {
        self.inner.cart().is_empty()
    }

    /// Lines as an array of `{ id, name, price, quantity }`
    pub fn items(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.inner.cart().lines())
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize cart: {}", e)))
    }

    /// Fingerprint of the current contents, used as the session cache key
    pub fn fingerprint(&self) -> String {
        fingerprint_cart(self.inner.cart())
    }
}

impl Default for WasmCart {
    fn default() -> Self {
        Self::new()
    }
}

/// Session-secret cache over `sessionStorage`
#[wasm_bindgen]
pub struct WasmSessionCache {
    inner: SessionSecretCache<PageStorage, JsClock>,
}

#[wasm_bindgen]
impl WasmSessionCache {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmSessionCache {
        let store = PageStorage::open_or_memory(StorageArea::Session);
        Self {
            inner: SessionSecretCache::with_clock(store, JsClock),
        }
    }

    /// Cached secret for `fingerprint`, if still valid
    pub fn get(&self, fingerprint: &str) -> Option<String> {
        self.inner.get(fingerprint)
    }

    pub fn put(
        &self,
        fingerprint: &str,
        secret: &str,
        amount: f64,
        currency: &str,
    ) -> Result<(), JsValue> {
        let currency = parse_currency(currency)?;
        self.inner.put(fingerprint, secret, amount, currency);
        Ok(())
    }

    #[wasm_bindgen(js_name = evictExpired)]
    pub fn evict_expired(&self) -> u32 {
        clamp_count(self.inner.evict_expired() as i64)
    }

    #[wasm_bindgen(js_name = evictAll)]
    pub fn evict_all(&self) -> u32 {
        clamp_count(self.inner.evict_all() as i64)
    }

    /// `{ total, valid, expired }`
    pub fn stats(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.stats())
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize stats: {}", e)))
    }
}

impl Default for WasmSessionCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a major-unit amount for display, e.g. `format_price(19.99, "usd")`
#[wasm_bindgen]
pub fn format_price(amount: f64, currency: &str) -> Result<String, JsValue> {
    let currency = parse_currency(currency)?;
    Ok(Price::new(amount, currency).display())
}

/// Validate a cart line id
#[wasm_bindgen]
pub fn validate_line_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 100
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

pub(crate) fn warn(message: &str) {
    web_sys::console::warn_1(&JsValue::from_str(message));
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
