//! Stripe webhook ingestion: the real-time half of order creation.
//!
//! The handler verifies the signature against the raw body before touching
//! anything else, handles only `checkout.session.completed`, and acknowledges
//! every other event type so Stripe does not retry it. Rejections at the
//! verification stage answer with plain text, mirroring what Stripe shows in
//! its delivery logs.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::error::msg;
use crate::orders::{self, reconcile, WriteOutcome};
use crate::payments::{CheckoutSession, StripeWebhookEvent, CHECKOUT_SESSION_COMPLETED};
use crate::state::AppState;

/// Early rejection before the event is processed: status plus a plain-text
/// explanation.
type WebhookReject = (StatusCode, String);

/// Acknowledgment body for accepted deliveries.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl WebhookAck {
    fn ok() -> Self {
        Self {
            success: true,
            reason: None,
        }
    }

    fn ok_with(reason: &'static str) -> Self {
        Self {
            success: true,
            reason: Some(reason),
        }
    }

    fn unhandled() -> Self {
        Self {
            success: false,
            reason: Some(msg::UNHANDLED_EVENT_TYPE),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook/stripe", post(handle_stripe_webhook))
}

pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match process_event(state, &headers, &body).await {
        Ok(ack) => Json(ack).into_response(),
        Err((status, message)) => (status, message).into_response(),
    }
}

async fn process_event(
    state: AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<WebhookAck, WebhookReject> {
    let signature = extract_signature(headers)?;

    match state.stripe.verify_webhook_signature(body, &signature) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("Stripe webhook rejected: signature mismatch");
            return Err((
                StatusCode::BAD_REQUEST,
                "Webhook Error: signature verification failed".to_string(),
            ));
        }
        Err(e) => {
            tracing::warn!("Stripe webhook rejected: {}", e);
            return Err((StatusCode::BAD_REQUEST, format!("Webhook Error: {}", e)));
        }
    }

    let event: StripeWebhookEvent = serde_json::from_slice(body).map_err(|e| {
        tracing::warn!("Stripe webhook rejected: unparseable event: {}", e);
        (
            StatusCode::BAD_REQUEST,
            format!("Webhook Error: {}", msg::INVALID_EVENT_PAYLOAD),
        )
    })?;

    if event.event_type != CHECKOUT_SESSION_COMPLETED {
        tracing::debug!("Ignoring Stripe event type: {}", event.event_type);
        return Ok(WebhookAck::unhandled());
    }

    let session: CheckoutSession = serde_json::from_value(event.data.object).map_err(|e| {
        tracing::warn!("Stripe webhook rejected: unparseable session: {}", e);
        (
            StatusCode::BAD_REQUEST,
            format!("Webhook Error: {}", msg::INVALID_SESSION_PAYLOAD),
        )
    })?;

    // Self-healing: each verified delivery also sweeps for older sessions
    // whose webhooks never arrived. Detached, so it cannot slow or fail
    // this response.
    reconcile::spawn_reconcile_sweep(state.clone());

    match orders::record_session(&state, &session).await {
        Ok(WriteOutcome::Created(_)) => Ok(WebhookAck::ok()),
        Ok(WriteOutcome::AlreadyRecorded) => Ok(WebhookAck::ok_with(msg::ORDER_ALREADY_RECORDED)),
        Err(e) => {
            tracing::error!("Stripe webhook processing failed for {}: {}", session.id, e);
            Err((
                StatusCode::BAD_REQUEST,
                format!("Webhook handler error: {}", e),
            ))
        }
    }
}

fn extract_signature(headers: &HeaderMap) -> Result<String, WebhookReject> {
    headers
        .get("stripe-signature")
        .ok_or((
            StatusCode::BAD_REQUEST,
            msg::MISSING_STRIPE_SIGNATURE.to_string(),
        ))?
        .to_str()
        .map(|s| s.to_string())
        .map_err(|e| {
            tracing::debug!("Invalid UTF-8 in Stripe signature header: {}", e);
            (
                StatusCode::BAD_REQUEST,
                "Invalid signature header".to_string(),
            )
        })
}
