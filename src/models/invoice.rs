use serde::{Deserialize, Serialize};

use crate::models::InvoiceLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "Draft",
            InvoiceStatus::Issued => "Issued",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Cancelled => "Cancelled",
        }
    }

    /// Value sent as the `status` query parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i32,
    pub number: String,
    pub client_id: i32,
    pub client_name: String,
    pub date: chrono::NaiveDate,
    pub status: InvoiceStatus,
    pub payment_method_id: i32,
    pub salesperson_id: Option<i32>,
    pub general_discount: f64,
    // List responses omit the lines; only the detail endpoint includes them.
    #[serde(default)]
    pub lines: Vec<InvoiceLine>,
    pub total: f64,
}
