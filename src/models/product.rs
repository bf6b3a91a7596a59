use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub price: f64,
    pub stock: f64,
    /// Services have no physical stock.
    pub is_service: bool,
    pub product_type_id: Option<i32>,
    pub category_id: Option<i32>,
    pub brand_id: Option<i32>,
}
