//! Pure mapping from a completed checkout session to the order the store
//! should record. No network calls happen here; both the webhook path and
//! the reconciliation sweeper feed it the same inputs.

use std::collections::BTreeMap;

use crate::error::{AppError, Result};
use crate::models::{CreateOrder, OrderItem, OrderStatus, SelectedColor, ShippingAddress};
use crate::payments::{CheckoutSession, SessionAddress, SessionLineItem};

/// Metadata key carrying the store id of the purchased product.
pub const META_PRODUCT_ID: &str = "productId";
/// Metadata key marking that a color was chosen.
pub const META_COLOR: &str = "color";
pub const META_COLOR_NAME: &str = "colorName";
pub const META_COLOR_HEX: &str = "colorHex";

/// Keys the pipeline itself writes. Everything else in the product metadata
/// is a free-form variant selection.
pub const RESERVED_METADATA_KEYS: [&str; 4] =
    [META_PRODUCT_ID, META_COLOR, META_COLOR_NAME, META_COLOR_HEX];

/// Build the order record for a completed session and its line items.
pub fn map_session(session: &CheckoutSession, line_items: &[SessionLineItem]) -> Result<CreateOrder> {
    let items = line_items
        .iter()
        .map(|line| map_line_item(session, line))
        .collect::<Result<Vec<_>>>()?;

    let shipping_address = session
        .collected_information
        .as_ref()
        .and_then(|info| info.shipping_details.as_ref())
        .and_then(|details| details.address.as_ref())
        .and_then(map_shipping_address);

    let customer_email = session
        .customer_details
        .as_ref()
        .and_then(|details| details.email.clone())
        .unwrap_or_default();

    Ok(CreateOrder {
        customer_email,
        shipping_address,
        items,
        status: OrderStatus::default(),
        stripe_session_id: session.id.clone(),
        total_amount: session.amount_total.unwrap_or(0),
    })
}

fn map_line_item(session: &CheckoutSession, line: &SessionLineItem) -> Result<OrderItem> {
    let metadata = line
        .price
        .as_ref()
        .and_then(|price| price.product.as_ref())
        .map(|product| &product.metadata)
        .ok_or_else(|| AppError::MissingProductReference {
            session_id: session.id.clone(),
        })?;

    let product: i64 = metadata
        .get(META_PRODUCT_ID)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| AppError::MissingProductReference {
            session_id: session.id.clone(),
        })?;

    // A color only counts as chosen when the `color` key itself is present;
    // `colorName`/`colorHex` refine it but never stand alone.
    let selected_color = metadata.get(META_COLOR).map(|color| SelectedColor {
        name: metadata
            .get(META_COLOR_NAME)
            .unwrap_or(color)
            .clone(),
        hex: metadata.get(META_COLOR_HEX).cloned(),
    });

    let variants: BTreeMap<String, String> = metadata
        .iter()
        .filter(|(key, _)| !RESERVED_METADATA_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    // The processor reports no quantity for some line shapes; zero only
    // appears on malformed data. Both collapse to 1, which also keeps the
    // unit price division safe.
    let quantity = match line.quantity {
        Some(q) if q != 0 => q,
        _ => 1,
    };
    let amount_total = line.amount_total.unwrap_or(0);

    Ok(OrderItem {
        product,
        selected_color,
        selected_variants: (!variants.is_empty()).then_some(variants),
        quantity,
        unit_price: amount_total as f64 / quantity as f64,
    })
}

/// A usable address needs the store's required fields. Anything less is
/// treated as if no address was collected.
fn map_shipping_address(addr: &SessionAddress) -> Option<ShippingAddress> {
    Some(ShippingAddress {
        line1: addr.line1.clone()?,
        line2: addr.line2.clone(),
        city: addr.city.clone()?,
        state: addr.state.clone(),
        postal_code: addr.postal_code.clone()?,
        country: addr.country.clone()?,
    })
}
