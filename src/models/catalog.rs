use serde::{Deserialize, Serialize};

/// A product type, category, or brand. The three master-data lists share the
/// same shape and only differ in which endpoint they live behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    ProductType,
    Category,
    Brand,
}

impl CatalogKind {
    pub fn label(&self) -> &'static str {
        match self {
            CatalogKind::ProductType => "Product Types",
            CatalogKind::Category => "Categories",
            CatalogKind::Brand => "Brands",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            CatalogKind::ProductType => "product-types",
            CatalogKind::Category => "categories",
            CatalogKind::Brand => "brands",
        }
    }
}
