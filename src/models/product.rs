//! Local product written by the ERPNext import

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tax class applied to imported remedies (5 % GST slab)
pub const DEFAULT_TAX_CLASS: &str = "5";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Simple,
    Variable,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Simple => "simple",
            ProductType::Variable => "variable",
        }
    }
}

/// Product fields written on insert or overwritten on update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub erp_item_code: String,
    pub name: String,
    pub product_type: ProductType,
    pub description: String,
    pub hsn_code: String,
    pub price: Decimal,
    pub stock: i32,
    pub weight: f64,
    pub image: Option<String>,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    /// ERPNext item group kept as text when no local category was resolved
    pub category_label: Option<String>,
    pub tax_status: String,
    pub tax_class: String,
}
