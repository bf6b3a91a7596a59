use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub product_id: i32,
    pub product_name: String,
    pub unit_price: f64,
    pub quantity: f64,
    /// Per-line discount in percent (0..=100).
    pub discount: f64,
}
