use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Fulfillment state of an order in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    Unfulfilled,
    Processing,
    Shipped,
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Unfulfilled
    }
}

/// A color choice attached to a cart or order item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedColor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
}

/// Shipping address as the store records it. Field names follow the store
/// schema, which keeps the processor's address keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
}

/// One purchased line on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Store id of the purchased product.
    pub product: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_color: Option<SelectedColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_variants: Option<BTreeMap<String, String>>,
    pub quantity: i64,
    /// Price per unit in the smallest currency unit (cents).
    pub unit_price: f64,
}

/// Data required to create an order in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrder {
    pub customer_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    /// Checkout session that produced this order. Unique in the store, which
    /// is what makes order creation idempotent per session.
    pub stripe_session_id: String,
    /// Order total in the smallest currency unit (cents).
    pub total_amount: i64,
}

/// A persisted order as read back from the store. Only the fields this
/// service consumes are modeled; the store owns the full document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub stripe_session_id: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub total_amount: Option<i64>,
}
