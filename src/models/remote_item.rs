//! Remote item (ERPNext `Item` doctype) models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, BoolFromInt};
use utoipa::ToSchema;

/// Fields requested from the ERPNext `Item` resource
pub const ERPNEXT_ITEM_FIELDS: &[&str] = &[
    "item_code",
    "item_name",
    "item_group",
    "description",
    "standard_rate",
    "opening_stock",
    "weight_per_unit",
    "gst_hsn_code",
    "image",
    "has_variants",
];

/// Raw record as returned by `GET /api/resource/Item`.
///
/// Every field is optional on the wire; [`RemoteItem::try_from`] validates
/// the record once so the rest of the pipeline never re-checks it.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErpnextItemRecord {
    pub item_code: Option<String>,
    pub item_name: Option<String>,
    pub item_group: Option<String>,
    pub description: Option<String>,
    pub standard_rate: Option<Decimal>,
    pub opening_stock: Option<f64>,
    pub weight_per_unit: Option<f64>,
    #[serde(alias = "hsn_code")]
    pub gst_hsn_code: Option<String>,
    pub image: Option<String>,
    #[serde_as(as = "Option<BoolFromInt>")]
    pub has_variants: Option<bool>,
}

/// Immutable snapshot of an ERPNext item as fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RemoteItem {
    pub item_code: String,
    pub item_name: String,
    /// Coarse ERPNext category label
    pub item_group: String,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub standard_rate: Decimal,
    pub opening_stock: u32,
    pub weight_per_unit: f64,
    pub hsn_code: Option<String>,
    pub image: Option<String>,
    pub has_variants: bool,
}

impl TryFrom<ErpnextItemRecord> for RemoteItem {
    type Error = String;

    fn try_from(record: ErpnextItemRecord) -> Result<Self, Self::Error> {
        let item_code = non_blank(record.item_code)
            .ok_or_else(|| "ERPNext item without item_code".to_string())?;
        let item_name = non_blank(record.item_name).unwrap_or_else(|| item_code.clone());

        let opening_stock = record
            .opening_stock
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(|s| s.round().min(u32::MAX as f64) as u32)
            .unwrap_or(0);

        Ok(Self {
            item_code,
            item_name,
            item_group: non_blank(record.item_group).unwrap_or_default(),
            description: non_blank(record.description),
            standard_rate: record.standard_rate.unwrap_or(Decimal::ZERO),
            opening_stock,
            weight_per_unit: record
                .weight_per_unit
                .filter(|w| w.is_finite() && *w >= 0.0)
                .unwrap_or(0.0),
            hsn_code: non_blank(record.gst_hsn_code),
            image: non_blank(record.image),
            has_variants: record.has_variants.unwrap_or(false),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
