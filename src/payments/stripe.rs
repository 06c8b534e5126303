use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::StripeConfig;
use crate::error::{AppError, Result, msg};

type HmacSha256 = Hmac<Sha256>;

pub const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Event type that drives order creation. Everything else is acknowledged
/// and ignored.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Stripe product tax code for "General - Tangible Goods".
const TAX_CODE_GENERAL: &str = "txcd_99999999";

const CHECKOUT_CURRENCY: &str = "usd";

/// Stripe caps line item listing at 100 entries per page, which is also
/// more than a single cart can produce.
const LINE_ITEMS_PAGE_LIMIT: &str = "100";

#[derive(Debug, Deserialize)]
struct CreateCheckoutSessionResponse {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct SessionList {
    data: Vec<CheckoutSession>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct LineItemList {
    data: Vec<SessionLineItem>,
}

/// One line item for an outgoing checkout session. `metadata` is attached to
/// the session's ad-hoc product so the webhook can reconstruct what was
/// bought without a separate lookup.
#[derive(Debug, Clone)]
pub struct CheckoutLineItem {
    pub name: String,
    pub description: String,
    /// Price per unit in cents.
    pub unit_amount: i64,
    pub quantity: i64,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: String,
    webhook_secret: String,
}

impl StripeClient {
    pub fn new(client: Client, config: &StripeConfig) -> Self {
        Self {
            client,
            api_base: STRIPE_API_BASE.to_string(),
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    /// Point the client at a different API base URL. Tests use this to
    /// target a local mock server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Create a checkout session with ad-hoc prices built from the cart.
    ///
    /// Returns the session id and the hosted payment page URL to redirect
    /// the customer to.
    pub async fn create_checkout_session(
        &self,
        items: &[CheckoutLineItem],
        success_url: &str,
        cancel_url: &str,
    ) -> Result<(String, String)> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("success_url".into(), success_url.into()),
            ("cancel_url".into(), cancel_url.into()),
            ("automatic_tax[enabled]".into(), "true".into()),
            (
                "shipping_address_collection[allowed_countries][0]".into(),
                "US".into(),
            ),
        ];

        for (i, item) in items.iter().enumerate() {
            let prefix = format!("line_items[{}]", i);
            form.push((format!("{}[quantity]", prefix), item.quantity.to_string()));
            form.push((
                format!("{}[price_data][currency]", prefix),
                CHECKOUT_CURRENCY.to_string(),
            ));
            form.push((
                format!("{}[price_data][unit_amount]", prefix),
                item.unit_amount.to_string(),
            ));
            form.push((
                format!("{}[price_data][product_data][name]", prefix),
                item.name.clone(),
            ));
            if !item.description.is_empty() {
                form.push((
                    format!("{}[price_data][product_data][description]", prefix),
                    item.description.clone(),
                ));
            }
            form.push((
                format!("{}[price_data][product_data][tax_code]", prefix),
                TAX_CODE_GENERAL.to_string(),
            ));
            for (key, value) in &item.metadata {
                form.push((
                    format!("{}[price_data][product_data][metadata][{}]", prefix, key),
                    value.clone(),
                ));
            }
        }

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Processor(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Processor(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        let session: CreateCheckoutSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Processor(format!("Failed to parse Stripe response: {}", e)))?;

        Ok((session.id, session.url))
    }

    /// List completed checkout sessions created at or after `created_gte`
    /// (Unix seconds), newest first, capped at `limit`.
    pub async fn list_completed_sessions(
        &self,
        created_gte: i64,
        limit: u32,
    ) -> Result<Vec<CheckoutSession>> {
        let created = created_gte.to_string();
        let limit_param = limit.to_string();

        let response = self
            .client
            .get(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .query(&[
                ("status", "complete"),
                ("created[gte]", created.as_str()),
                ("limit", limit_param.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Processor(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Processor(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        let list: SessionList = response
            .json()
            .await
            .map_err(|e| AppError::Processor(format!("Failed to parse Stripe response: {}", e)))?;

        if list.has_more {
            tracing::warn!(
                "Completed session listing truncated at {} results; older sessions are picked up by later sweeps",
                limit
            );
        }

        Ok(list.data)
    }

    /// Fetch a session's line items with their product metadata expanded.
    pub async fn list_line_items(&self, session_id: &str) -> Result<Vec<SessionLineItem>> {
        let response = self
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{}/line_items",
                self.api_base, session_id
            ))
            .basic_auth(&self.secret_key, None::<&str>)
            .query(&[
                ("expand[]", "data.price.product"),
                ("limit", LINE_ITEMS_PAGE_LIMIT),
            ])
            .send()
            .await
            .map_err(|e| AppError::Processor(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Processor(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        let list: LineItemList = response
            .json()
            .await
            .map_err(|e| AppError::Processor(format!("Failed to parse Stripe response: {}", e)))?;

        Ok(list.data)
    }

    /// Maximum age of a webhook timestamp before it's rejected (in seconds).
    /// Stripe recommends 300 seconds (5 minutes).
    const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        // Stripe signature format: t=timestamp,v1=signature
        let parts: Vec<&str> = signature.split(',').collect();

        let mut timestamp = None;
        let mut sig_v1 = None;

        for part in parts {
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(s) = part.strip_prefix("v1=") {
                sig_v1 = Some(s);
            }
        }

        let timestamp_str = timestamp.ok_or_else(|| {
            AppError::SignatureVerificationFailed(msg::INVALID_SIGNATURE_FORMAT.into())
        })?;
        let sig_v1 = sig_v1.ok_or_else(|| {
            AppError::SignatureVerificationFailed(msg::INVALID_SIGNATURE_FORMAT.into())
        })?;

        // Parse and validate timestamp to prevent replay attacks.
        // Reject webhooks older than WEBHOOK_TIMESTAMP_TOLERANCE_SECS.
        let timestamp: i64 = timestamp_str.parse().map_err(|_| {
            AppError::SignatureVerificationFailed(msg::INVALID_TIMESTAMP_IN_SIGNATURE.into())
        })?;

        let now = chrono::Utc::now().timestamp();
        let age = now - timestamp;

        if age > Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS {
            tracing::warn!(
                "Stripe webhook rejected: timestamp too old (age={}s, max={}s)",
                age,
                Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS
            );
            return Ok(false);
        }

        // Also reject timestamps from the future (clock skew tolerance: 60 seconds)
        if age < -60 {
            tracing::warn!(
                "Stripe webhook rejected: timestamp in the future (age={}s)",
                age
            );
            return Ok(false);
        }

        // Construct signed payload
        let signed_payload = format!("{}.{}", timestamp_str, String::from_utf8_lossy(payload));

        // Compute expected signature
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal(msg::INVALID_WEBHOOK_SECRET.into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        // Use constant-time comparison to prevent timing attacks.
        // An attacker could otherwise measure response times to progressively
        // discover the correct signature byte-by-byte.
        let expected_bytes = expected.as_bytes();
        let provided_bytes = sig_v1.as_bytes();

        // Length check is not constant-time, but that's fine - signature length
        // is not secret (it's always 64 hex chars for SHA-256)
        if expected_bytes.len() != provided_bytes.len() {
            return Ok(false);
        }

        Ok(expected_bytes.ct_eq(provided_bytes).into())
    }
}

/// Generic Stripe webhook event - object is parsed based on event_type
#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

// ============ checkout.session.completed ============

/// A checkout session as Stripe reports it, both inside webhook events and
/// from the sessions listing API. Only the fields the order pipeline reads
/// are modeled.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Order total in cents, after tax.
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub collected_information: Option<CollectedInformation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectedInformation {
    #[serde(default)]
    pub shipping_details: Option<ShippingDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShippingDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<SessionAddress>,
}

/// Raw address fields as collected by the processor. Everything is optional
/// at the wire level; completeness is enforced when mapping to an order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionAddress {
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// One line item of a completed session, with the ad-hoc product expanded so
/// its metadata is available inline.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionLineItem {
    #[serde(default)]
    pub quantity: Option<i64>,
    /// Line total in cents, after discounts and tax.
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub price: Option<LineItemPrice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemPrice {
    #[serde(default)]
    pub product: Option<ExpandedProduct>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpandedProduct {
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}
