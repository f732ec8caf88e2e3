//! Storefront cart pricing

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::CartConfig,
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CartLine {
    pub product_id: Uuid,
    #[validate(length(min = 1))]
    pub name: String,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[validate(range(min = 1))]
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CartTotals {
    pub item_count: u32,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub shipping: Decimal,
    #[schema(value_type = String)]
    pub tax: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
}

/// Price a cart: flat shipping below the free-shipping threshold, flat-rate tax
/// rounded to whole currency units.
///
/// Amounts or quantities too large to represent are rejected.
pub fn quote(lines: &[CartLine], pricing: &CartConfig) -> AppResult<CartTotals> {
    let mut subtotal = Decimal::ZERO;
    let mut item_count: u32 = 0;
    for line in lines {
        let amount = line
            .unit_price
            .checked_mul(Decimal::from(line.quantity))
            .ok_or_else(|| out_of_range(&line.name))?;
        subtotal = subtotal
            .checked_add(amount)
            .ok_or_else(|| out_of_range(&line.name))?;
        item_count = item_count
            .checked_add(line.quantity)
            .ok_or_else(|| out_of_range(&line.name))?;
    }

    let shipping = if lines.is_empty() || subtotal >= pricing.free_shipping_threshold {
        Decimal::ZERO
    } else {
        pricing.flat_shipping
    };
    let tax = subtotal
        .checked_mul(pricing.tax_rate)
        .ok_or_else(|| AppError::BadRequest("Cart tax is out of range".to_string()))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let total = subtotal
        .checked_add(shipping)
        .and_then(|t| t.checked_add(tax))
        .ok_or_else(|| AppError::BadRequest("Cart total is out of range".to_string()))?;

    Ok(CartTotals {
        item_count,
        subtotal,
        shipping,
        tax,
        total,
    })
}

fn out_of_range(name: &str) -> AppError {
    AppError::BadRequest(format!("Cart line '{}' is out of range", name))
}
