use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    authz::require_owner_or_admin,
    error::ApiError,
    orders::repo::Order,
    payments::{
        dto::{
            ConfirmRequest, CreateIntentRequest, CreateProviderOrderRequest, IntentCreated,
            PaymentStatusView, RazorpayRefundRequest, RefundIssued, ProviderOrderCreated,
            SettlementStatus, StripeRefundRequest, VerifiedPayment, VerifyRequest,
        },
        gateway::{from_minor_units, to_minor_units, RazorpayGateway, StripeGateway},
        razorpay, stripe,
    },
    response::ApiResponse,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payments/stripe/create-intent", post(create_intent))
        .route("/payments/stripe/confirm", post(confirm))
        .route("/payments/stripe/refund", post(stripe_refund))
        // Webhook is unauthenticated; the signature is the credential.
        .route("/payments/stripe/webhook", post(webhook))
        .route("/payments/razorpay/create-order", post(create_provider_order))
        .route("/payments/razorpay/verify", post(verify))
        .route("/payments/razorpay/refund", post(razorpay_refund))
        .route("/payments/status/:order_id", get(payment_status))
}

#[instrument(skip(state, payload))]
pub async fn create_intent(
    State(state): State<AppState>,
    _actor: AuthUser,
    Json(payload): Json<CreateIntentRequest>,
) -> Result<Json<ApiResponse<IntentCreated>>, ApiError> {
    if payload.amount <= 0.0 {
        return Err(ApiError::Validation("Amount must be positive".into()));
    }

    let intent = state
        .stripe
        .create_intent(
            to_minor_units(payload.amount),
            "inr",
            payload.order_id,
            payload.customer_email.as_deref(),
        )
        .await?;

    info!(order_id = %payload.order_id, intent_id = %intent.id, "payment intent created");
    Ok(Json(ApiResponse::data(IntentCreated {
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
        amount: from_minor_units(intent.amount_minor),
    })))
}

#[instrument(skip(state, payload))]
pub async fn confirm(
    State(state): State<AppState>,
    _actor: AuthUser,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<ApiResponse<SettlementStatus>>, ApiError> {
    let intent = state.stripe.retrieve_intent(&payload.payment_intent_id).await?;

    let settlement = SettlementStatus {
        status: intent.status.clone(),
        amount: from_minor_units(intent.amount_minor),
    };

    if intent.status == "succeeded" {
        let first_application = Order::mark_payment_completed(
            &state.db,
            payload.order_id,
            Some(&payload.payment_intent_id),
            None,
        )
        .await?;
        info!(
            order_id = %payload.order_id,
            first_application,
            "payment confirmed as completed"
        );
        return Ok(Json(ApiResponse::message("Payment successful", settlement)));
    }

    Ok(Json(ApiResponse::data(settlement)))
}

/// Provider-signed asynchronous path; drives the same transitions as
/// `confirm` and is idempotent with it in either order.
#[instrument(skip(state, headers, body))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Validation("Invalid webhook".into()))?;

    let event = stripe::webhook_event(&body, signature, &state.config.stripe.webhook_secret)
        .ok_or_else(|| ApiError::Validation("Invalid webhook".into()))?;

    match event {
        stripe::WebhookEvent::PaymentSucceeded {
            intent_id,
            order_id: Some(order_id),
        } => {
            let first = Order::mark_payment_completed(&state.db, order_id, Some(&intent_id), None)
                .await?;
            info!(%order_id, first_application = first, "webhook: payment succeeded");
        }
        stripe::WebhookEvent::PaymentFailed {
            order_id: Some(order_id),
        } => {
            let changed = Order::mark_payment_failed(&state.db, order_id).await?;
            info!(%order_id, changed, "webhook: payment failed");
        }
        stripe::WebhookEvent::Refunded {
            order_id: Some(order_id),
            ..
        } => {
            let changed = Order::mark_refunded(&state.db, order_id, None).await?;
            info!(%order_id, changed, "webhook: charge refunded");
        }
        other => {
            warn!(event = ?other, "webhook without order reference ignored");
        }
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Webhook received"
    })))
}

#[instrument(skip(state, payload))]
pub async fn stripe_refund(
    State(state): State<AppState>,
    _actor: AuthUser,
    Json(payload): Json<StripeRefundRequest>,
) -> Result<Json<ApiResponse<RefundIssued>>, ApiError> {
    if payload.charge_id.is_empty() {
        return Err(ApiError::Validation("Charge ID is required".into()));
    }

    let refund = state
        .stripe
        .refund(&payload.charge_id, payload.amount.map(to_minor_units))
        .await?;

    if let Some(order_id) = payload.order_id {
        Order::mark_refunded(&state.db, order_id, Some(&refund.id)).await?;
    }

    info!(refund_id = %refund.id, "stripe refund issued");
    Ok(Json(ApiResponse::data(RefundIssued {
        refund_id: refund.id,
        amount: from_minor_units(refund.amount_minor),
        status: refund.status,
    })))
}

/// Razorpay-style flow: the response carries the public key id the client
/// SDK needs alongside the provider order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOrderResponse {
    pub status: &'static str,
    pub data: ProviderOrderCreated,
    pub key_id: String,
}

#[instrument(skip(state, payload))]
pub async fn create_provider_order(
    State(state): State<AppState>,
    _actor: AuthUser,
    Json(payload): Json<CreateProviderOrderRequest>,
) -> Result<Json<ProviderOrderResponse>, ApiError> {
    if payload.amount <= 0.0 {
        return Err(ApiError::Validation("Amount must be positive".into()));
    }

    let receipt = payload.order_id.to_string();
    let provider_order = state
        .razorpay
        .create_order(to_minor_units(payload.amount), "INR", &receipt)
        .await?;

    info!(order_id = %payload.order_id, provider_order_id = %provider_order.id, "razorpay order created");
    Ok(Json(ProviderOrderResponse {
        status: "success",
        data: ProviderOrderCreated {
            order_id: provider_order.id,
            amount: from_minor_units(provider_order.amount_minor),
            currency: provider_order.currency,
            status: provider_order.status,
        },
        key_id: state.config.razorpay.key_id.clone(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn verify(
    State(state): State<AppState>,
    _actor: AuthUser,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<ApiResponse<VerifiedPayment>>, ApiError> {
    if payload.razorpay_order_id.is_empty()
        || payload.razorpay_payment_id.is_empty()
        || payload.razorpay_signature.is_empty()
    {
        return Err(ApiError::Validation("Missing payment details".into()));
    }

    // A bad signature is a verification failure, never a server error, and
    // must leave the order untouched.
    if !razorpay::verify_signature(
        &payload.razorpay_order_id,
        &payload.razorpay_payment_id,
        &payload.razorpay_signature,
        &state.config.razorpay.key_secret,
    ) {
        warn!(order_id = %payload.order_id, "razorpay signature mismatch");
        return Err(ApiError::Validation("Payment verification failed".into()));
    }

    let payment = state
        .razorpay
        .fetch_payment(&payload.razorpay_payment_id)
        .await?;

    Order::mark_payment_completed(
        &state.db,
        payload.order_id,
        None,
        Some((
            payload.razorpay_order_id.as_str(),
            payload.razorpay_payment_id.as_str(),
        )),
    )
    .await?;

    info!(order_id = %payload.order_id, payment_id = %payment.id, "razorpay payment verified");
    Ok(Json(ApiResponse::message(
        "Payment verified successfully",
        VerifiedPayment {
            payment_id: payment.id,
            amount: from_minor_units(payment.amount_minor),
            currency: payment.currency,
            status: payment.status,
        },
    )))
}

#[instrument(skip(state, payload))]
pub async fn razorpay_refund(
    State(state): State<AppState>,
    _actor: AuthUser,
    Json(payload): Json<RazorpayRefundRequest>,
) -> Result<Json<ApiResponse<RefundIssued>>, ApiError> {
    if payload.razorpay_payment_id.is_empty() {
        return Err(ApiError::Validation("Payment ID is required".into()));
    }

    let refund = state
        .razorpay
        .refund(
            &payload.razorpay_payment_id,
            payload.amount.map(to_minor_units),
        )
        .await?;

    if let Some(order_id) = payload.order_id {
        Order::mark_refunded(&state.db, order_id, Some(&refund.id)).await?;
    }

    info!(refund_id = %refund.id, "razorpay refund issued");
    Ok(Json(ApiResponse::data(RefundIssued {
        refund_id: refund.id,
        amount: from_minor_units(refund.amount_minor),
        status: refund.status,
    })))
}

#[instrument(skip(state))]
pub async fn payment_status(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<PaymentStatusView>>, ApiError> {
    let order = Order::find_by_id(&state.db, order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".into()))?;
    require_owner_or_admin(&actor, order.customer_id, "Not authorized")?;

    Ok(Json(ApiResponse::data(PaymentStatusView {
        order_id: order.id,
        payment_status: order.payment_status,
        total_amount: order.total,
        payment_method: order.payment_method,
        created_at: order.created_at,
    })))
}
