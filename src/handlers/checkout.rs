//! Checkout initiation: turns a submitted cart into a hosted payment page.
//!
//! Prices always come from the store, never from the client. What the client
//! chooses (product, color, variants) is copied into the session's product
//! metadata so the webhook and the sweeper can rebuild the order later
//! without trusting anything but Stripe and the store.

use std::collections::BTreeMap;

use axum::{extract::State, routing::post, Router};
use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};
use crate::extractors::Json;
use crate::models::{merge_items, CartItem, Product};
use crate::orders::mapper::{
    META_COLOR, META_COLOR_HEX, META_COLOR_NAME, META_PRODUCT_ID, RESERVED_METADATA_KEYS,
};
use crate::payments::CheckoutLineItem;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartItem>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    /// Hosted payment page to redirect the customer to.
    pub url: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/checkout", post(create_checkout))
}

pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let items = merge_items(request.items);
    if items.is_empty() {
        return Err(AppError::BadRequest(msg::EMPTY_CART.into()));
    }

    let mut line_items = Vec::with_capacity(items.len());
    for item in &items {
        let product = state.store.fetch_product(item.id).await?;
        line_items.push(build_line_item(&product, item));
    }

    let (session_id, url) = state
        .stripe
        .create_checkout_session(
            &line_items,
            &state.checkout_success_url,
            &state.checkout_cancel_url,
        )
        .await?;

    Ok(Json(CheckoutResponse { session_id, url }))
}

fn build_line_item(product: &Product, item: &CartItem) -> CheckoutLineItem {
    let mut metadata = BTreeMap::new();
    metadata.insert(META_PRODUCT_ID.to_string(), product.id.to_string());
    if let Some(color) = &item.color {
        metadata.insert(META_COLOR.to_string(), color.name.clone());
        metadata.insert(META_COLOR_NAME.to_string(), color.name.clone());
        if let Some(hex) = &color.hex {
            metadata.insert(META_COLOR_HEX.to_string(), hex.clone());
        }
    }
    if let Some(variants) = &item.other_variants {
        for (key, value) in variants {
            // A variant named like a reserved key would corrupt the order
            // mapping on the way back in.
            if RESERVED_METADATA_KEYS.contains(&key.as_str()) {
                continue;
            }
            metadata.insert(key.clone(), value.clone());
        }
    }

    CheckoutLineItem {
        name: product.name.clone(),
        description: describe_selection(product, item),
        unit_amount: (product.price * 100.0).round() as i64,
        quantity: item.quantity,
        metadata,
    }
}

/// Human-readable line for the payment page: the product description plus a
/// summary of the chosen color and variants.
fn describe_selection(product: &Product, item: &CartItem) -> String {
    let mut parts = Vec::new();
    if let Some(color) = &item.color {
        parts.push(format!("Color: {}", color.name));
    }
    if let Some(variants) = &item.other_variants {
        if !variants.is_empty() {
            let summary = variants
                .iter()
                .map(|(key, value)| format!("{}: {}", key, value))
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(summary);
        }
    }
    let selection = parts.join(" | ");

    if product.description.is_empty() {
        selection
    } else if selection.is_empty() {
        product.description.clone()
    } else {
        format!("{} - {}", product.description, selection)
    }
}
