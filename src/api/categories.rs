//! Local category endpoints

use axum::{extract::State, Json};

use crate::{error::AppResult, models::CategoryTree};

/// List categories with their subcategories
#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    responses(
        (status = 200, description = "Category tree", body = Vec<CategoryTree>)
    )
)]
pub async fn list_categories(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<CategoryTree>>> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(Json(categories))
}
