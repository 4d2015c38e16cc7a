//! # Session Provider
//!
//! Trait for payment providers that issue session secrets, and the
//! cache-aside flow that consults the `SessionSecretCache` before calling
//! one.
//!
//! ```text
//!   cart ──▶ fingerprint ──▶ cache.get ──hit──▶ cached secret
//!                               │
//!                              miss
//!                               ▼
//!                  provider.create_session ──▶ cache.put ──▶ fresh secret
//! ```

use crate::cache::{fingerprint_cart, SessionSecretCache};
use crate::cart::Cart;
use crate::clock::Clock;
use crate::error::{PaymentError, PaymentResult};
use crate::money::{Currency, Price};
use crate::storage::KeyValueStore;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Parameters for a new payment session
#[derive(Debug, Clone)]
pub struct SessionRequest {
    /// Cache key of the cart this session pays for, forwarded to the
    /// provider as `metadata[cart_fingerprint]`
    pub fingerprint: String,

    /// Amount to charge, smallest currency unit
    pub amount: i64,

    pub currency: Currency,

    /// Connected sub-account to create the session on, if not the platform
    pub connected_account: Option<String>,

    /// Metadata forwarded to the provider
    pub metadata: HashMap<String, String>,
}

/// A session created by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSession {
    /// Provider's session/intent ID
    pub session_id: String,

    /// Secret the client needs to confirm payment
    pub client_secret: String,
}

/// Payment provider able to create client-confirmable sessions
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Create a payment session for the given amount.
    async fn create_session(&self, request: &SessionRequest) -> PaymentResult<ProviderSession>;

    /// Get the provider name (for logging and metadata).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared provider (dynamic dispatch)
pub type BoxedSessionProvider = Arc<dyn SessionProvider>;

/// Outcome of `resolve_session`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSession {
    pub client_secret: String,

    /// Cache key used for this cart
    pub fingerprint: String,

    /// Cart total
    pub amount: Price,

    /// True when the secret came from the cache
    pub cached: bool,

    /// Provider session ID, known only for fresh sessions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Fingerprint of a cart scoped to the account the session is created on.
///
/// Platform sessions use the bare cart fingerprint.
pub fn scoped_fingerprint(cart: &Cart, connected_account: Option<&str>) -> String {
    let fp = fingerprint_cart(cart);
    match connected_account {
        Some(account) => format!("{}_{}", account, fp),
        None => fp,
    }
}

/// Return a session secret for the cart, creating one only on cache miss.
///
/// Cache failures degrade to a miss. Provider failures propagate and leave
/// the cache untouched.
#[instrument(skip(cache, provider, cart), fields(provider = provider.provider_name(), items = cart.lines().len()))]
pub async fn resolve_session<S, C>(
    cache: &SessionSecretCache<S, C>,
    provider: &dyn SessionProvider,
    cart: &Cart,
    connected_account: Option<&str>,
) -> PaymentResult<ResolvedSession>
where
    S: KeyValueStore,
    C: Clock,
{
    if cart.is_empty() {
        return Err(PaymentError::InvalidRequest("Cart has no items".to_string()));
    }

    let amount = Price::new(cart.subtotal(), cart.currency());
    if amount.amount <= 0 {
        return Err(PaymentError::InvalidRequest(format!(
            "Cart total must be positive, got {}",
            amount.display()
        )));
    }

    let fingerprint = scoped_fingerprint(cart, connected_account);

    if let Some(client_secret) = cache.get(&fingerprint) {
        debug!("Session cache hit for {}", fingerprint);
        return Ok(ResolvedSession {
            client_secret,
            fingerprint,
            amount,
            cached: true,
            session_id: None,
        });
    }

    let mut metadata = HashMap::new();
    metadata.insert("item_count".to_string(), cart.item_count().to_string());

    let request = SessionRequest {
        fingerprint: fingerprint.clone(),
        amount: amount.amount,
        currency: amount.currency,
        connected_account: connected_account.map(String::from),
        metadata,
    };

    let session = provider.create_session(&request).await?;

    info!(
        "Created {} session {} for {}",
        provider.provider_name(),
        session.session_id,
        amount.display()
    );

    cache.put(
        &fingerprint,
        &session.client_secret,
        cart.subtotal(),
        cart.currency(),
    );

    Ok(ResolvedSession {
        client_secret: session.client_secret,
        fingerprint,
        amount,
        cached: false,
        session_id: Some(session.session_id),
    })
}
