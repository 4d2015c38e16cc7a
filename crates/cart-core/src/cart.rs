//! # Cart
//!
//! Client-local cart: line items merged by id, with subtotal and item count
//! derived from the lines after every mutation.
//!
//! `Cart` is the pure aggregate. `PersistentCart` wraps it with a storage key
//! and writes a snapshot through after each mutation.

use crate::money::Currency;
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A line in the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Line identity (product id). Unique within a cart.
    pub id: String,

    /// Display name
    pub name: String,

    /// Unit price in major units (dollars, not cents)
    pub price: f64,

    /// Quantity. Always > 0 for a line held by a `Cart`.
    pub quantity: i64,

    /// Currency tag; `Cart` skips lines tagged with a different currency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
}

impl CartLine {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64, quantity: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            quantity,
            currency: None,
        }
    }

    /// Builder: set currency
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    /// Line total in major units
    pub fn total(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

/// Ordered collection of cart lines with derived totals.
///
/// Serializes to the persisted snapshot shape
/// `{items, subtotal, itemCount, currency}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<CartLine>,
    subtotal: f64,
    item_count: i64,
    currency: Currency,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new(Currency::default())
    }
}

impl Cart {
    /// Create an empty cart
    pub fn new(currency: Currency) -> Self {
        Self {
            items: Vec::new(),
            subtotal: 0.0,
            item_count: 0,
            currency,
        }
    }

    /// Build a cart by adding each line in order (ids are merged)
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>, currency: Currency) -> Self {
        let mut cart = Self::new(currency);
        for line in lines {
            cart.add_line(line);
        }
        cart
    }

    /// Add a line, merging quantities with an existing line of the same id.
    ///
    /// The incoming quantity is not validated. A line whose resulting
    /// quantity is not positive is dropped from the cart; merged quantities
    /// saturate at the `i64` bounds. A line tagged with a currency other
    /// than the cart's is skipped.
    pub fn add_line(&mut self, line: CartLine) {
        if let Some(currency) = line.currency.filter(|c| *c != self.currency) {
            warn!(
                "Skipping cart line {} priced in {}, cart is {}",
                line.id, currency, self.currency
            );
            return;
        }

        match self.items.iter().position(|l| l.id == line.id) {
            Some(idx) => {
                let existing = &mut self.items[idx];
                existing.quantity = existing.quantity.saturating_add(line.quantity);
                if existing.quantity <= 0 {
                    self.items.remove(idx);
                }
            }
            None if line.quantity > 0 => self.items.push(line),
            None => debug!("Ignoring new cart line {} with quantity {}", line.id, line.quantity),
        }
        self.recompute();
    }

    /// Replace a line's quantity. `quantity <= 0` removes the line.
    /// Unknown ids are ignored.
    pub fn update_quantity(&mut self, id: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove_line(id);
            return;
        }
        if let Some(line) = self.items.iter_mut().find(|l| l.id == id) {
            line.quantity = quantity;
        }
        self.recompute();
    }

    /// Remove the line with the given id, if present
    pub fn remove_line(&mut self, id: &str) {
        self.items.retain(|l| l.id != id);
        self.recompute();
    }

    /// Remove every line
    pub fn clear(&mut self) {
        self.items.clear();
        self.recompute();
    }

    fn recompute(&mut self) {
        self.subtotal = self.items.iter().fold(0.0, |acc, l| acc + l.total());
        self.item_count = self
            .items
            .iter()
            .fold(0i64, |acc, l| acc.saturating_add(l.quantity));
    }

    /// Lines in insertion order
    pub fn lines(&self) -> &[CartLine] {
        &self.items
    }

    /// Find a line by id
    pub fn line(&self, id: &str) -> Option<&CartLine> {
        self.items.iter().find(|l| l.id == id)
    }

    /// Subtotal in major units
    pub fn subtotal(&self) -> f64 {
        self.subtotal
    }

    /// Sum of quantities
    pub fn item_count(&self) -> i64 {
        self.item_count
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Parse a persisted snapshot.
    ///
    /// The snapshot must be a JSON object with an `items` array of lines.
    /// Stored totals are ignored and recomputed; stored lines with a
    /// non-positive quantity are dropped.
    pub fn from_snapshot(json: &str) -> Result<Self, SnapshotError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| SnapshotError::Malformed(e.to_string()))?;

        let items = value
            .get("items")
            .filter(|v| v.is_array())
            .cloned()
            .ok_or(SnapshotError::MissingItems)?;

        let lines: Vec<CartLine> =
            serde_json::from_value(items).map_err(|e| SnapshotError::Malformed(e.to_string()))?;

        let currency = match value.get("currency") {
            Some(c) => serde_json::from_value(c.clone())
                .map_err(|e| SnapshotError::Malformed(e.to_string()))?,
            None => Currency::default(),
        };

        let mut cart = Self::new(currency);
        cart.items = lines
            .into_iter()
            .filter(|l| l.quantity > 0 && l.currency.map_or(true, |c| c == currency))
            .collect();
        cart.recompute();
        Ok(cart)
    }

    /// Serialize to the persisted snapshot shape
    pub fn to_snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Reasons a persisted cart snapshot is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot has no items sequence")]
    MissingItems,

    #[error("malformed snapshot: {0}")]
    Malformed(String),
}

/// Cart persisted under a single storage key.
///
/// Storage failures never reach the caller: reads degrade to an empty cart,
/// writes leave the in-memory cart authoritative.
#[derive(Debug)]
pub struct PersistentCart<S> {
    cart: Cart,
    store: S,
    key: String,
}

impl<S: KeyValueStore> PersistentCart<S> {
    /// Hydrate from storage. Corrupt snapshots are deleted.
    pub fn load(store: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let cart = match store.get(&key) {
            Ok(Some(json)) => match Cart::from_snapshot(&json) {
                Ok(cart) => {
                    debug!("Hydrated cart {}: {} lines", key, cart.lines().len());
                    cart
                }
                Err(e) => {
                    warn!("Discarding corrupt cart snapshot {}: {}", key, e);
                    if let Err(e) = store.remove(&key) {
                        warn!("Failed to delete corrupt cart snapshot {}: {}", key, e);
                    }
                    Cart::default()
                }
            },
            Ok(None) => Cart::default(),
            Err(e) => {
                warn!("Cart storage unavailable, starting empty: {}", e);
                Cart::default()
            }
        };

        Self { cart, store, key }
    }

    /// Current cart state
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Storage key the snapshot lives under
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn add_line(&mut self, line: CartLine) {
        self.cart.add_line(line);
        self.persist();
    }

    pub fn update_quantity(&mut self, id: &str, quantity: i64) {
        self.cart.update_quantity(id, quantity);
        self.persist();
    }

    pub fn remove_line(&mut self, id: &str) {
        self.cart.remove_line(id);
        self.persist();
    }

    pub fn clear(&mut self) {
        self.cart.clear();
        self.persist();
    }

    fn persist(&self) {
        if self.cart.is_empty() {
            if let Err(e) = self.store.remove(&self.key) {
                warn!("Failed to remove cart snapshot {}: {}", self.key, e);
            }
            return;
        }

        let result = self
            .cart
            .to_snapshot()
            .map_err(|e| e.to_string())
            .and_then(|json| self.store.set(&self.key, &json).map_err(|e| e.to_string()));

        if let Err(e) = result {
            warn!("Failed to persist cart {}: {}", self.key, e);
        }
    }
}
