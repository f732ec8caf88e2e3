//! Categories repository

use std::collections::HashMap;

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Category, CategoryTree, Subcategory},
};

use super::conflict_on_duplicate;

/// Partition of `product_categories` holding top-level categories
const CATEGORY_TYPE: &str = "category";

#[derive(Clone)]
pub struct CategoriesRepository {
    pool: Pool<Postgres>,
}

impl CategoriesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Find a category id by exact name
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM product_categories WHERE name = $1 AND type = $2",
        )
        .bind(name)
        .bind(CATEGORY_TYPE)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    /// Insert a category; a duplicate name yields `AppError::Conflict`
    pub async fn create(&self, name: &str, slug: &str) -> AppResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO product_categories (id, name, slug, type) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(slug)
        .bind(CATEGORY_TYPE)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, &format!("Category '{}'", name)))
    }

    pub async fn find_subcategory(&self, category_id: Uuid, name: &str) -> AppResult<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM product_subcategories WHERE category_id = $1 AND name = $2",
        )
        .bind(category_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn create_subcategory(&self, category_id: Uuid, name: &str, slug: &str) -> AppResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO product_subcategories (id, category_id, name, slug)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(category_id)
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, &format!("Subcategory '{}'", name)))
    }

    /// All categories ordered by name, each with its subcategories
    pub async fn list_tree(&self) -> AppResult<Vec<CategoryTree>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug FROM product_categories WHERE type = $1 ORDER BY name",
        )
        .bind(CATEGORY_TYPE)
        .fetch_all(&self.pool)
        .await?;

        let subcategories = sqlx::query_as::<_, Subcategory>(
            "SELECT id, category_id, name, slug FROM product_subcategories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_category: HashMap<Uuid, Vec<Subcategory>> = HashMap::new();
        for sub in subcategories {
            by_category.entry(sub.category_id).or_default().push(sub);
        }

        Ok(categories
            .into_iter()
            .map(|category| CategoryTree {
                subcategories: by_category.remove(&category.id).unwrap_or_default(),
                category,
            })
            .collect())
    }
}
