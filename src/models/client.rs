use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i32,
    pub name: String,
    pub tax_id: String,
    pub document_type_id: Option<i32>,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
}
