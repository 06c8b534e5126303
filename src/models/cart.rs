use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::SelectedColor;

/// One line of a client-submitted cart. The same product can appear on
/// several lines when the chosen color or variants differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Store id of the product.
    pub id: i64,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<SelectedColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_variants: Option<BTreeMap<String, String>>,
}

impl CartItem {
    /// Whether two cart lines denote the same purchasable configuration:
    /// same product, same color (name and hex), same variant selections.
    /// An absent variant map and an empty one are the same configuration.
    pub fn same_configuration(&self, other: &CartItem) -> bool {
        if self.id != other.id || self.color != other.color {
            return false;
        }
        let empty = BTreeMap::new();
        let mine = self.other_variants.as_ref().unwrap_or(&empty);
        let theirs = other.other_variants.as_ref().unwrap_or(&empty);
        mine == theirs
    }
}

/// Collapse a submitted cart into one line per configuration, summing
/// quantities. Lines with a non-positive quantity are dropped.
pub fn merge_items(items: Vec<CartItem>) -> Vec<CartItem> {
    let mut merged: Vec<CartItem> = Vec::new();
    for item in items {
        if item.quantity <= 0 {
            continue;
        }
        match merged.iter_mut().find(|line| line.same_configuration(&item)) {
            Some(line) => line.quantity += item.quantity,
            None => merged.push(item),
        }
    }
    merged
}
