//! Repository layer for database operations

pub mod categories;
pub mod mapping_rules;
pub mod products;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{CategoryTree, MappingRule, ProductDraft},
};

/// Persistence seam used by the import pipeline.
///
/// Insert methods return [`AppError::Conflict`] on a uniqueness violation so
/// callers can re-read the row another writer created.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_category(&self, name: &str) -> AppResult<Option<Uuid>>;
    async fn insert_category(&self, name: &str, slug: &str) -> AppResult<Uuid>;
    async fn find_subcategory(&self, category_id: Uuid, name: &str) -> AppResult<Option<Uuid>>;
    async fn insert_subcategory(&self, category_id: Uuid, name: &str, slug: &str) -> AppResult<Uuid>;
    async fn list_categories(&self) -> AppResult<Vec<CategoryTree>>;

    async fn find_product(&self, erp_item_code: &str) -> AppResult<Option<Uuid>>;
    async fn insert_product(&self, product: &ProductDraft) -> AppResult<Uuid>;
    async fn update_product(&self, id: Uuid, product: &ProductDraft) -> AppResult<()>;

    async fn list_mapping_rules(&self) -> AppResult<Vec<MappingRule>>;
    async fn save_mapping_rule(&self, rule: &MappingRule) -> AppResult<()>;
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub categories: categories::CategoriesRepository,
    pub products: products::ProductsRepository,
    pub mapping_rules: mapping_rules::MappingRulesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            categories: categories::CategoriesRepository::new(pool.clone()),
            products: products::ProductsRepository::new(pool.clone()),
            mapping_rules: mapping_rules::MappingRulesRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Turn a unique-constraint failure into a conflict the caller can recover from
pub(crate) fn conflict_on_duplicate(err: sqlx::Error, what: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(format!("{} already exists", what))
        }
        _ => AppError::Database(err),
    }
}

#[async_trait]
impl CatalogStore for Repository {
    async fn find_category(&self, name: &str) -> AppResult<Option<Uuid>> {
        self.categories.find_by_name(name).await
    }

    async fn insert_category(&self, name: &str, slug: &str) -> AppResult<Uuid> {
        self.categories.create(name, slug).await
    }

    async fn find_subcategory(&self, category_id: Uuid, name: &str) -> AppResult<Option<Uuid>> {
        self.categories.find_subcategory(category_id, name).await
    }

    async fn insert_subcategory(&self, category_id: Uuid, name: &str, slug: &str) -> AppResult<Uuid> {
        self.categories.create_subcategory(category_id, name, slug).await
    }

    async fn list_categories(&self) -> AppResult<Vec<CategoryTree>> {
        self.categories.list_tree().await
    }

    async fn find_product(&self, erp_item_code: &str) -> AppResult<Option<Uuid>> {
        self.products.find_by_item_code(erp_item_code).await
    }

    async fn insert_product(&self, product: &ProductDraft) -> AppResult<Uuid> {
        self.products.create(product).await
    }

    async fn update_product(&self, id: Uuid, product: &ProductDraft) -> AppResult<()> {
        self.products.update(id, product).await
    }

    async fn list_mapping_rules(&self) -> AppResult<Vec<MappingRule>> {
        self.mapping_rules.list().await
    }

    async fn save_mapping_rule(&self, rule: &MappingRule) -> AppResult<()> {
        self.mapping_rules.upsert(rule).await
    }
}
