use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

/// Provider failures surface as values, never as panics or raw HTTP errors
/// leaking into handlers.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Provider(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
    pub amount_minor: i64,
}

#[derive(Debug, Clone)]
pub struct ProviderOrder {
    pub id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct ProviderPayment {
    pub id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct RefundReceipt {
    pub id: String,
    pub amount_minor: i64,
    pub status: String,
}

/// Intent-based provider: the server creates an intent, the client confirms
/// it, the server re-checks settlement.
#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        order_id: Uuid,
        receipt_email: Option<&str>,
    ) -> Result<PaymentIntent, GatewayError>;

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;

    async fn refund(
        &self,
        charge_id: &str,
        amount_minor: Option<i64>,
    ) -> Result<RefundReceipt, GatewayError>;
}

/// Order-based provider: the server creates a provider order, the client pays
/// it and hands back a payment id plus an HMAC signature for verification.
#[async_trait]
pub trait RazorpayGateway: Send + Sync {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<ProviderOrder, GatewayError>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<ProviderPayment, GatewayError>;

    async fn refund(
        &self,
        payment_id: &str,
        amount_minor: Option<i64>,
    ) -> Result<RefundReceipt, GatewayError>;
}

/// Providers bill in minor units (paise/cents); order totals are rupee
/// amounts.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn from_minor_units(minor: i64) -> f64 {
    minor as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_unit_conversion_rounds() {
        assert_eq!(to_minor_units(12.34), 1234);
        assert_eq!(to_minor_units(0.0), 0);
        assert_eq!(from_minor_units(1234), 12.34);
    }
}
