//! # Stripe PaymentIntents
//!
//! Session provider backed by the Stripe PaymentIntents API. The intent's
//! `client_secret` is the session secret the browser confirms payment with,
//! and the value the session cache stores.

use crate::config::StripeConfig;
use async_trait::async_trait;
use cart_core::{PaymentError, PaymentResult, ProviderSession, SessionProvider, SessionRequest};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, instrument};
use uuid::Uuid;

const PROVIDER: &str = "stripe";

/// Metadata key carrying the cart fingerprint on the intent
const FINGERPRINT_METADATA_KEY: &str = "cart_fingerprint";

/// Stripe PaymentIntent session provider
pub struct StripeIntentProvider {
    config: StripeConfig,
    client: Client,
}

impl StripeIntentProvider {
    /// Create a new provider
    pub fn new(config: StripeConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        let config = StripeConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Form body for `POST /v1/payment_intents`
    fn form_params(request: &SessionRequest) -> Vec<(String, String)> {
        let mut params = vec![
            ("amount".to_string(), request.amount.to_string()),
            ("currency".to_string(), request.currency.as_str().to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
            (
                format!("metadata[{}]", FINGERPRINT_METADATA_KEY),
                request.fingerprint.clone(),
            ),
        ];

        let mut metadata: Vec<_> = request
            .metadata
            .iter()
            .filter(|(key, _)| key.as_str() != FINGERPRINT_METADATA_KEY)
            .collect();
        metadata.sort();
        for (key, value) in metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }

        params
    }
}

#[async_trait]
impl SessionProvider for StripeIntentProvider {
    #[instrument(skip(self, request), fields(amount = request.amount, currency = %request.currency))]
    async fn create_session(&self, request: &SessionRequest) -> PaymentResult<ProviderSession> {
        if request.amount <= 0 {
            return Err(PaymentError::InvalidRequest(
                "PaymentIntent amount must be positive".to_string(),
            ));
        }

        let url = format!("{}/v1/payment_intents", self.config.api_base_url);
        let idempotency_key = Uuid::new_v4().to_string();

        debug!(
            "Creating Stripe PaymentIntent: amount={}, account={:?}",
            request.amount, request.connected_account
        );

        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", &idempotency_key)
            .form(&Self::form_params(request));

        if let Some(account) = &request.connected_account {
            builder = builder.header("Stripe-Account", account);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PaymentError::RateLimited {
                provider: PROVIDER.to_string(),
                retry_after_secs: retry_after.unwrap_or(1),
            });
        }

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(PaymentError::ProviderError {
                    provider: PROVIDER.to_string(),
                    message: error_response.error.message,
                });
            }

            return Err(PaymentError::ProviderError {
                provider: PROVIDER.to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let intent: StripePaymentIntentResponse = serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })?;

        let client_secret = intent.client_secret.ok_or_else(|| PaymentError::ProviderError {
            provider: PROVIDER.to_string(),
            message: format!("PaymentIntent {} has no client_secret", intent.id),
        })?;

        Ok(ProviderSession {
            session_id: intent.id,
            client_secret,
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripePaymentIntentResponse {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_core::Currency;
    use serde_json::json;
    use std::collections::HashMap;
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(account: Option<&str>) -> SessionRequest {
        let mut metadata = HashMap::new();
        metadata.insert("item_count".to_string(), "2".to_string());
        SessionRequest {
            fingerprint: "fp123".to_string(),
            amount: 150,
            currency: Currency::USD,
            connected_account: account.map(String::from),
            metadata,
        }
    }

    fn provider(server: &MockServer) -> StripeIntentProvider {
        let config = StripeConfig::new("sk_test_abc", "pk_test_xyz").with_api_base_url(server.uri());
        StripeIntentProvider::new(config).unwrap()
    }

    #[test]
    fn test_form_params() {
        let params = StripeIntentProvider::form_params(&request(None));

        assert!(params.contains(&("amount".to_string(), "150".to_string())));
        assert!(params.contains(&("currency".to_string(), "usd".to_string())));
        assert!(params.contains(&(
            "metadata[cart_fingerprint]".to_string(),
            "fp123".to_string()
        )));
        assert!(params.contains(&("metadata[item_count]".to_string(), "2".to_string())));
    }

    #[test]
    fn test_form_params_fingerprint_comes_from_request() {
        let mut req = request(None);
        req.metadata
            .insert("cart_fingerprint".to_string(), "stale".to_string());

        let params = StripeIntentProvider::form_params(&req);
        let fingerprints: Vec<_> = params
            .iter()
            .filter(|(k, _)| k == "metadata[cart_fingerprint]")
            .collect();
        assert_eq!(fingerprints.len(), 1);
        assert_eq!(fingerprints[0].1, "fp123");
    }

    #[tokio::test]
    async fn test_create_session_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("Authorization", "Bearer sk_test_abc"))
            .and(header_exists("Idempotency-Key"))
            .and(body_string_contains("amount=150"))
            .and(body_string_contains("currency=usd"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_123",
                "object": "payment_intent",
                "client_secret": "pi_123_secret_456",
                "amount": 150,
                "currency": "usd"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = provider(&server).create_session(&request(None)).await.unwrap();
        assert_eq!(session.session_id, "pi_123");
        assert_eq!(session.client_secret, "pi_123_secret_456");
    }

    #[tokio::test]
    async fn test_connected_account_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("Stripe-Account", "acct_42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_9",
                "client_secret": "pi_9_secret_9"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = provider(&server)
            .create_session(&request(Some("acct_42")))
            .await
            .unwrap();
        assert_eq!(session.client_secret, "pi_9_secret_9");
    }

    #[tokio::test]
    async fn test_stripe_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "type": "invalid_request_error",
                    "message": "Amount must be at least $0.50 usd"
                }
            })))
            .mount(&server)
            .await;

        let err = provider(&server).create_session(&request(None)).await.unwrap_err();
        match err {
            PaymentError::ProviderError { provider, message } => {
                assert_eq!(provider, "stripe");
                assert_eq!(message, "Amount must be at least $0.50 usd");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;

        let err = provider(&server).create_session(&request(None)).await.unwrap_err();
        assert!(matches!(
            err,
            PaymentError::RateLimited {
                retry_after_secs: 7,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_client_secret() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "pi_1" })))
            .mount(&server)
            .await;

        let err = provider(&server).create_session(&request(None)).await.unwrap_err();
        assert!(matches!(err, PaymentError::ProviderError { .. }));
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected_locally() {
        let server = MockServer::start().await;
        let mut req = request(None);
        req.amount = 0;

        let err = provider(&server).create_session(&req).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidRequest(_)));
    }
}
