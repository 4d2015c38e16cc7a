//! # cart-stripe
//!
//! Stripe session provider for checkout-cache-rs.
//!
//! `StripeIntentProvider` creates PaymentIntents and hands back their
//! `client_secret`, which the browser confirms payment with (Stripe
//! Elements / Payment Element). Sessions can be created on the platform
//! account or on a connected account via the `Stripe-Account` header.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cart_core::{resolve_session, MemoryStore, SessionSecretCache};
//! use cart_stripe::StripeIntentProvider;
//!
//! let provider = StripeIntentProvider::from_env()?;
//! let cache = SessionSecretCache::new(MemoryStore::new());
//!
//! // Reuses the cached secret while the cart is unchanged
//! let session = resolve_session(&cache, &provider, &cart, None).await?;
//! println!("client secret: {}", session.client_secret);
//! ```

pub mod config;
pub mod intents;

// Re-exports
pub use config::StripeConfig;
pub use intents::StripeIntentProvider;
