use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::warn;
use uuid::Uuid;

use super::gateway::{GatewayError, PaymentIntent, RefundReceipt, StripeGateway};

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_BASE_URL: &str = "https://api.stripe.com/v1";

pub struct HttpStripe {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl HttpStripe {
    pub fn new(http: reqwest::Client, secret_key: impl Into<String>) -> Self {
        Self {
            http,
            secret_key: secret_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, GatewayError> {
        if resp.status().is_success() {
            Ok(resp.json::<T>().await?)
        } else {
            let err = resp.json::<ApiErrorBody>().await?;
            Err(GatewayError::Provider(err.error.message))
        }
    }
}

#[derive(Debug, Deserialize)]
struct IntentBody {
    id: String,
    client_secret: Option<String>,
    status: String,
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct RefundBody {
    id: String,
    amount: i64,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl StripeGateway for HttpStripe {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        order_id: Uuid,
        receipt_email: Option<&str>,
    ) -> Result<PaymentIntent, GatewayError> {
        let amount = amount_minor.to_string();
        let order_id = order_id.to_string();
        let mut form: Vec<(&str, &str)> = vec![
            ("amount", &amount),
            ("currency", currency),
            ("metadata[orderId]", &order_id),
        ];
        if let Some(email) = receipt_email {
            form.push(("receipt_email", email));
        }
        let resp = self
            .http
            .post(format!("{}/payment_intents", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;
        let body: IntentBody = Self::parse(resp).await?;
        Ok(PaymentIntent {
            id: body.id,
            client_secret: body.client_secret,
            status: body.status,
            amount_minor: body.amount,
        })
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let resp = self
            .http
            .get(format!("{}/payment_intents/{}", self.base_url, intent_id))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;
        let body: IntentBody = Self::parse(resp).await?;
        Ok(PaymentIntent {
            id: body.id,
            client_secret: body.client_secret,
            status: body.status,
            amount_minor: body.amount,
        })
    }

    async fn refund(
        &self,
        charge_id: &str,
        amount_minor: Option<i64>,
    ) -> Result<RefundReceipt, GatewayError> {
        let amount;
        let mut form: Vec<(&str, &str)> = vec![("charge", charge_id)];
        if let Some(minor) = amount_minor {
            amount = minor.to_string();
            form.push(("amount", &amount));
        }
        let resp = self
            .http
            .post(format!("{}/refunds", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;
        let body: RefundBody = Self::parse(resp).await?;
        Ok(RefundReceipt {
            id: body.id,
            amount_minor: body.amount,
            status: body.status,
        })
    }
}

/// Webhook events the reconciliation flow reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    PaymentSucceeded {
        intent_id: String,
        order_id: Option<Uuid>,
    },
    PaymentFailed {
        order_id: Option<Uuid>,
    },
    Refunded {
        charge_id: String,
        order_id: Option<Uuid>,
    },
}

/// The signature over a webhook body: HMAC-SHA256 of `"{t}.{payload}"`,
/// hex-encoded. Exposed so tests can forge valid headers.
pub fn sign_payload(timestamp: i64, payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Checks the `Stripe-Signature` header (`t=...,v1=...`) against the raw
/// body. Any malformed header or mismatching signature is a plain `false`.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str) -> bool {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse().ok(),
            Some(("v1", v)) => signatures.push(v),
            _ => {}
        }
    }
    let Some(t) = timestamp else { return false };
    if signatures.is_empty() {
        return false;
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(t.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    signatures.into_iter().any(|sig| {
        hex::decode(sig)
            .map(|raw| mac.clone().verify_slice(&raw).is_ok())
            .unwrap_or(false)
    })
}

/// Verifies and maps a webhook delivery. Anything unverifiable, malformed or
/// of an uninteresting type is `None` — never an error.
pub fn webhook_event(payload: &[u8], sig_header: &str, secret: &str) -> Option<WebhookEvent> {
    if !verify_signature(payload, sig_header, secret) {
        warn!("webhook signature verification failed");
        return None;
    }

    #[derive(Deserialize)]
    struct Event {
        #[serde(rename = "type")]
        kind: String,
        data: EventData,
    }
    #[derive(Deserialize)]
    struct EventData {
        object: EventObject,
    }
    #[derive(Deserialize)]
    struct EventObject {
        id: String,
        #[serde(default)]
        metadata: std::collections::HashMap<String, String>,
    }

    let event: Event = match serde_json::from_slice(payload) {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "malformed webhook payload");
            return None;
        }
    };

    let order_id = event
        .data
        .object
        .metadata
        .get("orderId")
        .and_then(|v| Uuid::parse_str(v).ok());

    match event.kind.as_str() {
        "payment_intent.succeeded" => Some(WebhookEvent::PaymentSucceeded {
            intent_id: event.data.object.id,
            order_id,
        }),
        "payment_intent.payment_failed" => Some(WebhookEvent::PaymentFailed { order_id }),
        "charge.refunded" => Some(WebhookEvent::Refunded {
            charge_id: event.data.object.id,
            order_id,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    fn signed_header(payload: &[u8]) -> String {
        let t = 1_700_000_000;
        format!("t={},v1={}", t, sign_payload(t, payload, SECRET))
    }

    #[test]
    fn valid_signature_verifies() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        assert!(verify_signature(payload, &signed_header(payload), SECRET));
    }

    #[test]
    fn tampered_payload_fails() {
        let payload = br#"{"amount":100}"#;
        let header = signed_header(payload);
        assert!(!verify_signature(br#"{"amount":999}"#, &header, SECRET));
    }

    #[test]
    fn garbage_header_fails() {
        let payload = b"{}";
        assert!(!verify_signature(payload, "", SECRET));
        assert!(!verify_signature(payload, "t=abc,v1=zz", SECRET));
        assert!(!verify_signature(payload, "v1=deadbeef", SECRET));
    }

    #[test]
    fn succeeded_event_maps_with_order_id() {
        let order_id = Uuid::new_v4();
        let payload = serde_json::json!({
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "pi_123", "metadata": { "orderId": order_id } } }
        })
        .to_string();
        let event = webhook_event(payload.as_bytes(), &signed_header(payload.as_bytes()), SECRET)
            .expect("event should parse");
        assert_eq!(
            event,
            WebhookEvent::PaymentSucceeded {
                intent_id: "pi_123".into(),
                order_id: Some(order_id),
            }
        );
    }

    #[test]
    fn unverified_event_is_none() {
        let payload = br#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_1"}}}"#;
        assert!(webhook_event(payload, "t=1,v1=00", SECRET).is_none());
    }

    #[test]
    fn unknown_event_type_is_none() {
        let payload = br#"{"type":"customer.created","data":{"object":{"id":"cus_1"}}}"#;
        let header = signed_header(payload);
        assert!(webhook_event(payload, &header, SECRET).is_none());
    }
}
