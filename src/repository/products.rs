//! Products repository

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::ProductDraft,
};

use super::conflict_on_duplicate;

#[derive(Clone)]
pub struct ProductsRepository {
    pool: Pool<Postgres>,
}

impl ProductsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn find_by_item_code(&self, erp_item_code: &str) -> AppResult<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM products WHERE erp_item_code = $1")
            .bind(erp_item_code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn create(&self, p: &ProductDraft) -> AppResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO products (
                id, erp_item_code, name, product_type, description, hsn_code,
                price, stock, weight, image, category_id, subcategory_id,
                category_label, tax_status, tax_class, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, NOW(), NOW())
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&p.erp_item_code)
        .bind(&p.name)
        .bind(p.product_type.as_str())
        .bind(&p.description)
        .bind(&p.hsn_code)
        .bind(p.price)
        .bind(p.stock)
        .bind(p.weight)
        .bind(&p.image)
        .bind(p.category_id)
        .bind(p.subcategory_id)
        .bind(&p.category_label)
        .bind(&p.tax_status)
        .bind(&p.tax_class)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, &format!("Product '{}'", p.erp_item_code)))
    }

    /// Overwrite an existing product with freshly imported fields
    pub async fn update(&self, id: Uuid, p: &ProductDraft) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = $2, product_type = $3, description = $4, hsn_code = $5,
                price = $6, stock = $7, weight = $8, image = $9,
                category_id = $10, subcategory_id = $11, category_label = $12,
                tax_status = $13, tax_class = $14, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&p.name)
        .bind(p.product_type.as_str())
        .bind(&p.description)
        .bind(&p.hsn_code)
        .bind(p.price)
        .bind(p.stock)
        .bind(p.weight)
        .bind(&p.image)
        .bind(p.category_id)
        .bind(p.subcategory_id)
        .bind(&p.category_label)
        .bind(&p.tax_status)
        .bind(&p.tax_class)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Product {} not found", id)));
        }
        Ok(())
    }
}
