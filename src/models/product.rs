use serde::{Deserialize, Serialize};

/// A catalog product as served by the store. Only the fields checkout needs
/// are modeled; listing endpoints pass the store's documents through intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Display price in major currency units (e.g. 24.99 USD).
    pub price: f64,
}
