//! # Request Handlers
//!
//! Axum request handlers for session resolution and cache administration.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use cart_core::{resolve_session, CacheStats, Cart, CartLine, Currency, PaymentError};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create payment session request
#[derive(Debug, Deserialize)]
pub struct PaymentSessionRequest {
    /// Cart lines, in cart order
    #[serde(default)]
    pub items: Vec<SessionItem>,
    /// Cart currency code (defaults to "usd")
    #[serde(default)]
    pub currency: Option<String>,
    /// Connected account to create the session on (platform if absent)
    #[serde(default)]
    pub connected_account: Option<String>,
}

/// Line in a payment session request
#[derive(Debug, Deserialize)]
pub struct SessionItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Unit price, major units
    pub price: f64,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub currency: Option<String>,
}

fn default_quantity() -> i64 {
    1
}

/// Create payment session response
#[derive(Debug, Serialize)]
pub struct PaymentSessionResponse {
    /// Secret the browser confirms payment with
    pub client_secret: String,
    /// Cache key of the cart
    pub fingerprint: String,
    /// Total, major units
    pub amount: f64,
    /// Total, smallest currency unit
    pub amount_minor: i64,
    pub currency: Currency,
    /// Whether the secret was served from the cache
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Count of removed cache entries
#[derive(Debug, Serialize)]
pub struct EvictionResponse {
    pub removed: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn payment_error_to_response(err: PaymentError) -> ApiError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

fn bad_request(error: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(error, 400)),
    )
}

fn parse_currency(code: &str) -> Result<Currency, ApiError> {
    code.parse::<Currency>()
        .map_err(|e| bad_request(e.to_string()))
}

/// Largest quantity accepted for a single request line
const MAX_LINE_QUANTITY: i64 = i32::MAX as i64;

/// Build a cart from request lines, merging repeated ids
fn build_cart(request: &PaymentSessionRequest) -> Result<Cart, ApiError> {
    let currency = match &request.currency {
        Some(code) => parse_currency(code)?,
        None => Currency::default(),
    };

    let mut cart = Cart::new(currency);
    for item in &request.items {
        if item.id.is_empty() {
            return Err(bad_request("Cart line is missing an id"));
        }
        if !item.price.is_finite() || item.price < 0.0 {
            return Err(bad_request(format!("Invalid price for {}", item.id)));
        }
        if !(1..=MAX_LINE_QUANTITY).contains(&item.quantity) {
            return Err(bad_request(format!("Invalid quantity for {}", item.id)));
        }

        let mut line = CartLine::new(&item.id, &item.name, item.price, item.quantity);
        if let Some(code) = &item.currency {
            let line_currency = parse_currency(code)?;
            if line_currency != currency {
                let body = ErrorResponse::new("Mixed-currency carts are not supported", 400)
                    .with_details(format!("{} is {}, cart is {}", item.id, line_currency, currency));
                return Err((StatusCode::BAD_REQUEST, Json(body)));
            }
            line = line.with_currency(line_currency);
        }
        cart.add_line(line);
    }

    Ok(cart)
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "checkout-cache",
        "version": env!("CARGO_PKG_VERSION"),
        "time": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Return a payment session secret for the cart, reusing a cached one when
/// the cart is unchanged
#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn create_payment_session(
    State(state): State<AppState>,
    Json(request): Json<PaymentSessionRequest>,
) -> Result<Json<PaymentSessionResponse>, ApiError> {
    let cart = build_cart(&request)?;

    let resolved = resolve_session(
        state.cache.as_ref(),
        state.provider.as_ref(),
        &cart,
        request.connected_account.as_deref(),
    )
    .await
    .map_err(|e| {
        error!("Failed to resolve payment session: {}", e);
        payment_error_to_response(e)
    })?;

    info!(
        "Payment session for {} items, total={}, cached={}",
        cart.item_count(),
        resolved.amount.display(),
        resolved.cached
    );

    Ok(Json(PaymentSessionResponse {
        client_secret: resolved.client_secret,
        fingerprint: resolved.fingerprint,
        amount: resolved.amount.as_decimal(),
        amount_minor: resolved.amount.amount,
        currency: resolved.amount.currency,
        cached: resolved.cached,
        session_id: resolved.session_id,
    }))
}

/// Cache entry counts
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

/// Remove expired cache entries
pub async fn sweep_cache(State(state): State<AppState>) -> Json<EvictionResponse> {
    let removed = state.cache.evict_expired();
    info!("Manual cache sweep removed {} entries", removed);
    Json(EvictionResponse { removed })
}

/// Remove every cache entry
pub async fn clear_cache(State(state): State<AppState>) -> Json<EvictionResponse> {
    let removed = state.cache.evict_all();
    info!("Cache cleared: {} entries removed", removed);
    Json(EvictionResponse { removed })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(items: Vec<SessionItem>, currency: Option<&str>) -> PaymentSessionRequest {
        PaymentSessionRequest {
            items,
            currency: currency.map(String::from),
            connected_account: None,
        }
    }

    fn item(id: &str, price: f64, quantity: i64) -> SessionItem {
        SessionItem {
            id: id.to_string(),
            name: id.to_uppercase(),
            price,
            quantity,
            currency: None,
        }
    }

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400).with_details("more");
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);
        assert_eq!(err.details.as_deref(), Some("more"));
    }

    #[test]
    fn test_payment_error_conversion() {
        let err = PaymentError::InvalidRequest("Bad data".to_string());
        let (status, _json) = payment_error_to_response(err);
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let err = PaymentError::RateLimited {
            provider: "stripe".into(),
            retry_after_secs: 2,
        };
        let (status, _json) = payment_error_to_response(err);
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_build_cart_merges_lines() {
        let req = request(vec![item("a", 1.0, 1), item("b", 2.0, 1), item("a", 1.0, 2)], None);
        let cart = build_cart(&req).unwrap();

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.line("a").unwrap().quantity, 3);
        assert_eq!(cart.subtotal(), 5.0);
        assert_eq!(cart.currency(), Currency::USD);
    }

    #[test]
    fn test_build_cart_rejects_out_of_range_quantity() {
        let req = request(vec![item("a", 1.0, i64::MAX), item("b", 1.0, 1)], None);
        let (status, Json(body)) = build_cart(&req).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("quantity"));

        let req = request(vec![item("a", 1.0, MAX_LINE_QUANTITY), item("a", 1.0, 1)], None);
        let cart = build_cart(&req).unwrap();
        assert_eq!(cart.item_count(), MAX_LINE_QUANTITY + 1);
    }

    #[test]
    fn test_build_cart_rejects_bad_input() {
        assert!(build_cart(&request(vec![item("a", 1.0, 1)], Some("zzz"))).is_err());
        assert!(build_cart(&request(vec![item("", 1.0, 1)], None)).is_err());
        assert!(build_cart(&request(vec![item("a", -1.0, 1)], None)).is_err());
        assert!(build_cart(&request(vec![item("a", f64::NAN, 1)], None)).is_err());

        assert!(build_cart(&request(vec![item("a", 1.0, 0)], None)).is_err());
        assert!(build_cart(&request(vec![item("a", 1.0, -2)], None)).is_err());

        let mut eur = item("a", 1.0, 1);
        eur.currency = Some("eur".to_string());
        let (status, Json(body)) = build_cart(&request(vec![eur], Some("usd"))).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.details.is_some());
    }
}
