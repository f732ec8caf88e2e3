//! Local catalog category models

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Url-safe slug: lower-cased, whitespace runs collapsed to one hyphen
pub fn slugify(name: &str) -> String {
    WHITESPACE_RUN
        .replace_all(&name.to_lowercase(), "-")
        .into_owned()
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Subcategory {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub slug: String,
}

/// Category with its subcategories, for manual assignment pickers
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryTree {
    #[serde(flatten)]
    pub category: Category,
    pub subcategories: Vec<Subcategory>,
}
