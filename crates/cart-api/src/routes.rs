//! # Routes
//!
//! Axum router configuration for the checkout-cache API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - GET    /health                   - Health check
/// - POST   /api/v1/payment-session   - Resolve a session secret for a cart
/// - GET    /api/v1/cache/stats       - Cache entry counts
/// - POST   /api/v1/cache/sweep       - Evict expired entries
/// - DELETE /api/v1/cache             - Evict all entries
pub fn create_router(state: AppState) -> Router {
    // The browser calls payment-session directly from checkout pages
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let cache_routes = Router::new()
        .route("/", delete(handlers::clear_cache))
        .route("/stats", get(handlers::cache_stats))
        .route("/sweep", post(handlers::sweep_cache));

    let api_routes = Router::new()
        .route("/payment-session", post(handlers::create_payment_session))
        .nest("/cache", cache_routes);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use cart_core::{
        CacheConfig, KeyValueStore, MemoryStore, PaymentError, PaymentResult, ProviderSession,
        SessionProvider, SessionRequest,
    };
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct MockProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SessionProvider for MockProvider {
        async fn create_session(&self, request: &SessionRequest) -> PaymentResult<ProviderSession> {
            if request.amount > 1_000_000 {
                return Err(PaymentError::ProviderError {
                    provider: "mock".into(),
                    message: "amount too large".into(),
                });
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ProviderSession {
                session_id: format!("pi_{}", n),
                client_secret: format!("pi_{}_secret", n),
            })
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }

    fn app() -> (Router, MemoryStore, Arc<MockProvider>) {
        let store = MemoryStore::new();
        let provider = Arc::new(MockProvider {
            calls: AtomicUsize::new(0),
        });
        let state = AppState::with_provider(
            provider.clone(),
            store.clone(),
            CacheConfig::default(),
            AppConfig::default(),
        );
        (create_router(state), store, provider)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn cart_body() -> Value {
        json!({
            "items": [
                { "id": "1", "name": "One", "price": 1.00, "quantity": 1 },
                { "id": "2", "name": "Two", "price": 0.50, "quantity": 1 }
            ]
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _, _) = app();
        let (status, body) = send(&app, "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_payment_session_is_cached() {
        let (app, _, provider) = app();

        let (status, first) =
            send(&app, "POST", "/api/v1/payment-session", Some(cart_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["cached"], false);
        assert_eq!(first["client_secret"], "pi_1_secret");
        assert_eq!(first["amount_minor"], 150);
        assert_eq!(first["currency"], "usd");

        let (_, second) = send(&app, "POST", "/api/v1/payment-session", Some(cart_body())).await;
        assert_eq!(second["cached"], true);
        assert_eq!(second["client_secret"], "pi_1_secret");
        assert_eq!(second["fingerprint"], first["fingerprint"]);
        assert!(second.get("session_id").is_none());

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_changed_cart_gets_new_session() {
        let (app, _, provider) = app();
        send(&app, "POST", "/api/v1/payment-session", Some(cart_body())).await;

        let changed = json!({ "items": [{ "id": "1", "name": "One", "price": 1.00, "quantity": 3 }] });
        let (_, body) = send(&app, "POST", "/api/v1/payment-session", Some(changed)).await;

        assert_eq!(body["cached"], false);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_cart_is_bad_request() {
        let (app, _, _) = app();
        let (status, body) =
            send(&app, "POST", "/api/v1/payment-session", Some(json!({ "items": [] }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn test_provider_error_maps_to_bad_gateway() {
        let (app, store, _) = app();
        let body = json!({ "items": [{ "id": "big", "price": 20000.0, "quantity": 100 }] });
        let (status, _) = send(&app, "POST", "/api/v1/payment-session", Some(body)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_cache_admin_endpoints() {
        let (app, store, _) = app();
        send(&app, "POST", "/api/v1/payment-session", Some(cart_body())).await;
        store
            .set(
                "stripe_client_secret_stale",
                r#"{"secret":"s","created_at_ms":0,"amount":1.0,"currency":"usd"}"#,
            )
            .unwrap();

        let (_, stats) = send(&app, "GET", "/api/v1/cache/stats", None).await;
        assert_eq!(stats, json!({ "total": 2, "valid": 1, "expired": 1 }));

        let (_, swept) = send(&app, "POST", "/api/v1/cache/sweep", None).await;
        assert_eq!(swept["removed"], 1);

        let (_, cleared) = send(&app, "DELETE", "/api/v1/cache", None).await;
        assert_eq!(cleared["removed"], 1);

        let (_, stats) = send(&app, "GET", "/api/v1/cache/stats", None).await;
        assert_eq!(stats, json!({ "total": 0, "valid": 0, "expired": 0 }));
    }
}
