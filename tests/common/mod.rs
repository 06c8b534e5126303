//! Test utilities and fixtures for storefront integration tests

#![allow(dead_code)]

use axum::Router;
use serde_json::{json, Value};
use wiremock::MockServer;

pub use storefront::config::{ReconcileSettings, StoreConfig, StripeConfig};
pub use storefront::handlers;
pub use storefront::payments::StripeClient;
pub use storefront::state::AppState;
pub use storefront::store::StoreClient;

pub const TEST_SECRET_KEY: &str = "sk_test_xxx";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const TEST_STORE_API_KEY: &str = "store_test_key";

/// Build an AppState whose clients talk to the given mock servers.
/// The periodic sweep is disabled; tests trigger sweeps themselves.
pub fn test_state(stripe_base: &str, store_base: &str) -> AppState {
    let client = reqwest::Client::new();

    let stripe_config = StripeConfig {
        secret_key: TEST_SECRET_KEY.to_string(),
        webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
    };
    let store_config = StoreConfig {
        base_url: store_base.to_string(),
        api_key: TEST_STORE_API_KEY.to_string(),
    };

    AppState {
        stripe: StripeClient::new(client.clone(), &stripe_config).with_api_base(stripe_base),
        store: StoreClient::new(client, &store_config),
        checkout_success_url: "http://localhost:3001/shopping-cart".to_string(),
        checkout_cancel_url: "http://localhost:3001/shopping-cart".to_string(),
        reconcile: ReconcileSettings {
            window_secs: 24 * 60 * 60,
            limit: 100,
            interval_secs: 0,
        },
    }
}

/// Create a Router with all endpoints, as main assembles it (minus tracing).
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(handlers::catalog::router())
        .merge(handlers::checkout::router())
        .merge(handlers::webhooks::router())
        .with_state(state)
}

pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    String::from_utf8(bytes.to_vec()).expect("Response body is not UTF-8")
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Response body is not JSON")
}

// ============ Webhook signature helpers ============

/// Get current Unix timestamp as a string (for webhook signature tests)
pub fn current_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Get an old timestamp (for testing timestamp rejection)
pub fn old_timestamp() -> String {
    // 10 minutes ago - beyond the 5-minute tolerance
    (chrono::Utc::now().timestamp() - 600).to_string()
}

pub fn compute_stripe_signature(payload: &[u8], secret: &str, timestamp: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed_payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// A currently-valid `stripe-signature` header for the payload, signed with
/// the test webhook secret.
pub fn signature_header(payload: &[u8]) -> String {
    let timestamp = current_timestamp();
    let signature = compute_stripe_signature(payload, TEST_WEBHOOK_SECRET, &timestamp);
    format!("t={},v1={}", timestamp, signature)
}

// ============ Stripe fixture builders ============

/// A completed checkout session with a customer email and a full shipping
/// address, as Stripe reports it.
pub fn completed_session_json(session_id: &str) -> Value {
    json!({
        "id": session_id,
        "object": "checkout.session",
        "status": "complete",
        "payment_status": "paid",
        "amount_total": 4998,
        "currency": "usd",
        "customer_details": { "email": "jo@example.com", "name": "Jo Doe" },
        "collected_information": {
            "shipping_details": {
                "name": "Jo Doe",
                "address": {
                    "line1": "1 Main St",
                    "line2": null,
                    "city": "Springfield",
                    "state": "IL",
                    "postal_code": "62704",
                    "country": "US"
                }
            }
        }
    })
}

pub fn event_json(event_type: &str, object: Value) -> Value {
    json!({
        "id": "evt_test_1",
        "object": "event",
        "type": event_type,
        "data": { "object": object }
    })
}

/// One expanded line item whose product metadata points at a store product.
pub fn line_item_json(product_id: i64, quantity: i64, amount_total: i64) -> Value {
    json!({
        "id": "li_test_1",
        "object": "item",
        "quantity": quantity,
        "amount_total": amount_total,
        "price": {
            "id": "price_test_1",
            "product": {
                "id": "prod_test_1",
                "metadata": {
                    "productId": product_id.to_string(),
                    "color": "Walnut",
                    "colorName": "Dark Walnut",
                    "colorHex": "#5d432c",
                    "size": "L"
                }
            }
        }
    })
}

pub fn line_items_response(items: Vec<Value>) -> Value {
    json!({ "object": "list", "data": items, "has_more": false })
}

pub fn sessions_response(sessions: Vec<Value>) -> Value {
    json!({ "object": "list", "data": sessions, "has_more": false })
}

// ============ Store fixture builders ============

/// Wrap documents in the store's pagination envelope.
pub fn orders_page_response(docs: Vec<Value>) -> Value {
    let total = docs.len();
    json!({
        "docs": docs,
        "totalDocs": total,
        "totalPages": 1,
        "page": 1,
        "limit": 10,
        "pagingCounter": 1,
        "hasPrevPage": false,
        "hasNextPage": false,
        "prevPage": null,
        "nextPage": null
    })
}

pub fn stored_order_json(id: i64, session_id: &str) -> Value {
    json!({
        "id": id,
        "customerEmail": "jo@example.com",
        "items": [],
        "status": "unfulfilled",
        "stripeSessionId": session_id,
        "totalAmount": 4998,
        "createdAt": "2025-01-01T00:00:00.000Z",
        "updatedAt": "2025-01-01T00:00:00.000Z"
    })
}

pub fn created_order_response(id: i64, session_id: &str) -> Value {
    json!({
        "message": "Order successfully created.",
        "doc": stored_order_json(id, session_id)
    })
}

/// The store's validation error for a duplicate session id.
pub fn unique_violation_response() -> Value {
    json!({
        "errors": [{
            "name": "ValidationError",
            "message": "The following field is invalid: stripeSessionId (value must be unique)"
        }]
    })
}

// ============ Recorded request helpers ============

/// All requests the server received for `method` + `path`, bodies parsed
/// as JSON (empty bodies become `null`).
pub async fn recorded_bodies(server: &MockServer, method: &str, path: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|req| req.method.as_str() == method && req.url.path() == path)
        .map(|req| serde_json::from_slice(&req.body).unwrap_or(Value::Null))
        .collect()
}

pub async fn request_count(server: &MockServer, method: &str, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|req| req.method.as_str() == method && req.url.path() == path)
        .count()
}
