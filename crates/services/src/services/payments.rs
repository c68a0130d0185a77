use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum PaymentGatewayError {
    #[error("Payment gateway not configured: {0}")]
    Config(String),
    #[error("Gateway request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Gateway returned an error: {0}")]
    Gateway(String),
}

#[derive(Debug, Clone)]
pub struct PaymentGatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub webhook_secret: String,
    pub currency: String,
}

impl Default for PaymentGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("PAYMENT_GATEWAY_URL")
                .unwrap_or_else(|_| "https://api.payment.localhost".to_string()),
            api_key: std::env::var("PAYMENT_GATEWAY_API_KEY").unwrap_or_default(),
            webhook_secret: std::env::var("PAYMENT_WEBHOOK_SECRET").unwrap_or_default(),
            currency: std::env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
        }
    }
}

/// A created checkout session; `url` is where the author is redirected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    amount_cents: i64,
    currency: &'a str,
    reference: String,
    success_url: &'a str,
    cancel_url: &'a str,
}

/// Thin HTTP client for the checkout gateway.
#[derive(Debug, Clone)]
pub struct PaymentGateway {
    client: reqwest::Client,
    config: PaymentGatewayConfig,
}

impl PaymentGateway {
    pub fn new(config: PaymentGatewayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::new(PaymentGatewayConfig::default())
    }

    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    pub async fn create_checkout_session(
        &self,
        amount_cents: i64,
        reference: Uuid,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, PaymentGatewayError> {
        if self.config.api_key.is_empty() {
            return Err(PaymentGatewayError::Config(
                "PAYMENT_GATEWAY_API_KEY is not set".to_string(),
            ));
        }

        let request = CreateSessionRequest {
            amount_cents,
            currency: &self.config.currency,
            reference: reference.to_string(),
            success_url,
            cancel_url,
        };

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentGatewayError::Gateway(format!(
                "checkout session creation failed ({}): {}",
                status, body
            )));
        }

        Ok(response.json::<CheckoutSession>().await?)
    }

    /// Verify the webhook body against its HMAC-SHA256 hex signature.
    /// An unconfigured secret rejects everything; an empty key would let
    /// anyone forge events.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature_hex: &str) -> bool {
        if self.config.webhook_secret.is_empty() {
            return false;
        }
        let Ok(expected) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(self.config.webhook_secret.as_bytes())
        else {
            return false;
        };
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway_with_secret(secret: &str) -> PaymentGateway {
        PaymentGateway::new(PaymentGatewayConfig {
            base_url: "https://api.payment.localhost".into(),
            api_key: "test".into(),
            webhook_secret: secret.into(),
            currency: "usd".into(),
        })
    }

    fn sign(secret: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_verifies() {
        let gateway = gateway_with_secret("whsec_test");
        let payload = br#"{"event":"checkout.completed","session_id":"cs_1"}"#;
        let signature = sign("whsec_test", payload);
        assert!(gateway.verify_webhook_signature(payload, &signature));
    }

    #[test]
    fn tampered_payload_fails() {
        let gateway = gateway_with_secret("whsec_test");
        let signature = sign("whsec_test", b"original");
        assert!(!gateway.verify_webhook_signature(b"tampered", &signature));
    }

    #[test]
    fn malformed_signature_fails() {
        let gateway = gateway_with_secret("whsec_test");
        assert!(!gateway.verify_webhook_signature(b"payload", "not-hex"));
        assert!(!gateway.verify_webhook_signature(b"payload", ""));
    }

    #[test]
    fn unconfigured_secret_rejects_even_matching_signatures() {
        let gateway = gateway_with_secret("");
        let payload = br#"{"event":"checkout.completed","session_id":"cs_1"}"#;
        // A signature computed with the same empty key must still fail.
        let signature = sign("", payload);
        assert!(!gateway.verify_webhook_signature(payload, &signature));
    }
}
