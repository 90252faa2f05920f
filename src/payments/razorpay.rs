use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

use super::gateway::{GatewayError, ProviderOrder, ProviderPayment, RazorpayGateway, RefundReceipt};

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_BASE_URL: &str = "https://api.razorpay.com/v1";

pub struct HttpRazorpay {
    http: reqwest::Client,
    key_id: String,
    key_secret: String,
    base_url: String,
}

impl HttpRazorpay {
    pub fn new(
        http: reqwest::Client,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            key_id: key_id.into(),
            key_secret: key_secret.into(),
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
            Err(GatewayError::Provider(err.error.description))
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrderBody {
    id: String,
    amount: i64,
    currency: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct PaymentBody {
    id: String,
    amount: i64,
    currency: String,
    status: String,
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
    description: String,
}

#[async_trait]
impl RazorpayGateway for HttpRazorpay {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<ProviderOrder, GatewayError> {
        let resp = self
            .http
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({
                "amount": amount_minor,
                "currency": currency,
                "receipt": receipt,
            }))
            .send()
            .await?;
        let body: OrderBody = Self::parse(resp).await?;
        Ok(ProviderOrder {
            id: body.id,
            amount_minor: body.amount,
            currency: body.currency,
            status: body.status,
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<ProviderPayment, GatewayError> {
        let resp = self
            .http
            .get(format!("{}/payments/{}", self.base_url, payment_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?;
        let body: PaymentBody = Self::parse(resp).await?;
        Ok(ProviderPayment {
            id: body.id,
            amount_minor: body.amount,
            currency: body.currency,
            status: body.status,
        })
    }

    async fn refund(
        &self,
        payment_id: &str,
        amount_minor: Option<i64>,
    ) -> Result<RefundReceipt, GatewayError> {
        let body = match amount_minor {
            Some(minor) => json!({ "amount": minor }),
            None => json!({}),
        };
        let resp = self
            .http
            .post(format!("{}/payments/{}/refund", self.base_url, payment_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
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

/// The callback signature: HMAC-SHA256 over `"{order_id}|{payment_id}"` with
/// the key secret, hex-encoded.
pub fn compute_signature(provider_order_id: &str, payment_id: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(provider_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a client-supplied signature. A mismatch or
/// undecodable signature is a verification failure, not an error.
pub fn verify_signature(
    provider_order_id: &str,
    payment_id: &str,
    signature: &str,
    secret: &str,
) -> bool {
    let Ok(raw) = hex::decode(signature) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(provider_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    mac.verify_slice(&raw).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "rzp_test_secret";

    #[test]
    fn computed_signature_verifies() {
        let sig = compute_signature("order_9A33XWu170gUtm", "pay_29QQoUBi66xm2f", SECRET);
        assert!(verify_signature(
            "order_9A33XWu170gUtm",
            "pay_29QQoUBi66xm2f",
            &sig,
            SECRET
        ));
    }

    #[test]
    fn tampered_signature_fails() {
        let mut sig = compute_signature("order_1", "pay_1", SECRET);
        // Flip one hex digit.
        let last = sig.pop().unwrap();
        sig.push(if last == '0' { '1' } else { '0' });
        assert!(!verify_signature("order_1", "pay_1", &sig, SECRET));
    }

    #[test]
    fn signature_is_bound_to_both_ids() {
        let sig = compute_signature("order_1", "pay_1", SECRET);
        assert!(!verify_signature("order_1", "pay_2", &sig, SECRET));
        assert!(!verify_signature("order_2", "pay_1", &sig, SECRET));
    }

    #[test]
    fn non_hex_signature_fails_cleanly() {
        assert!(!verify_signature("order_1", "pay_1", "not-hex!", SECRET));
    }
}
