use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// User-facing message constants, shared between handlers and tests.
pub mod msg {
    pub const MISSING_STRIPE_SIGNATURE: &str = "Missing Stripe signature";
    pub const INVALID_SIGNATURE_FORMAT: &str = "Invalid signature format";
    pub const INVALID_TIMESTAMP_IN_SIGNATURE: &str = "Invalid timestamp in signature";
    pub const INVALID_WEBHOOK_SECRET: &str = "Invalid webhook secret";
    pub const INVALID_EVENT_PAYLOAD: &str = "Invalid event payload";
    pub const INVALID_SESSION_PAYLOAD: &str = "Invalid checkout session payload";
    pub const UNHANDLED_EVENT_TYPE: &str = "Unhandled event type";
    pub const ORDER_ALREADY_RECORDED: &str = "Order already recorded";
    pub const EMPTY_CART: &str = "Cart is empty";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Missing signature header")]
    MissingSignature,

    #[error("Signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    /// A line item's product metadata carries no product reference, so the
    /// session cannot be mapped to an order.
    #[error("Line item without product reference in session {session_id}")]
    MissingProductReference { session_id: String },

    /// The order store already holds an order for this session. Benign:
    /// callers treat it as confirmation that the order is recorded.
    #[error("Order already exists for session {session_id}")]
    DuplicateOrder { session_id: String },

    /// The order store rejected a request with a non-2xx status.
    #[error("Order store request to {endpoint} failed: {status} {status_text}")]
    StoreRequestFailed {
        status: u16,
        status_text: String,
        endpoint: String,
    },

    #[error("Payment processor error: {0}")]
    Processor(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", Some(msg.clone())),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", Some(msg.clone())),
            AppError::MissingSignature => {
                (StatusCode::BAD_REQUEST, msg::MISSING_STRIPE_SIGNATURE, None)
            }
            AppError::SignatureVerificationFailed(msg) => (
                StatusCode::BAD_REQUEST,
                "Signature verification failed",
                Some(msg.clone()),
            ),
            AppError::MissingProductReference { session_id } => (
                StatusCode::BAD_REQUEST,
                "Line item without product reference",
                Some(format!("session {}", session_id)),
            ),
            AppError::DuplicateOrder { session_id } => (
                StatusCode::CONFLICT,
                "Order already exists",
                Some(format!("session {}", session_id)),
            ),
            AppError::StoreRequestFailed {
                status,
                status_text,
                endpoint,
            } => {
                tracing::error!("Order store error: {} {} ({})", status, status_text, endpoint);
                (
                    StatusCode::BAD_GATEWAY,
                    "Order store request failed",
                    Some(format!("{}: {} {}", endpoint, status, status_text)),
                )
            }
            AppError::Processor(msg) => {
                tracing::error!("Payment processor error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Payment processor error", None)
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid JSON", Some(e.to_string()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
