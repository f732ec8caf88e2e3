//! Storefront cart endpoints

use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::cart::{quote, CartLine, CartTotals},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CartQuoteRequest {
    #[validate(nested)]
    pub lines: Vec<CartLine>,
}

/// Price a cart: subtotal, shipping, tax and total
#[utoipa::path(
    post,
    path = "/cart/quote",
    tag = "cart",
    request_body = CartQuoteRequest,
    responses(
        (status = 200, description = "Cart totals", body = CartTotals),
        (status = 400, description = "Invalid or out-of-range cart line")
    )
)]
pub async fn quote_cart(
    State(state): State<crate::AppState>,
    Json(request): Json<CartQuoteRequest>,
) -> AppResult<Json<CartTotals>> {
    request.validate()?;
    let totals = quote(&request.lines, &state.config.cart)?;
    Ok(Json(totals))
}
