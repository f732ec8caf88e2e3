//! Local catalog adapter: category and subcategory resolution

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{category::slugify, CategoryTree},
    repository::CatalogStore,
};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn list_categories(&self) -> AppResult<Vec<CategoryTree>> {
        self.store.list_categories().await
    }

    /// Id of the category named `name`, created if missing.
    ///
    /// A concurrent writer creating the same name first makes our insert
    /// conflict; the row it created is then returned.
    pub async fn get_or_create_category(&self, name: &str) -> AppResult<Uuid> {
        if let Some(id) = self.store.find_category(name).await? {
            return Ok(id);
        }

        match self.store.insert_category(name, &slugify(name)).await {
            Ok(id) => {
                tracing::info!("Created new category: {}", name);
                Ok(id)
            }
            Err(e) if e.is_conflict() => {
                tracing::debug!("Category {} created concurrently, re-reading", name);
                self.store.find_category(name).await?.ok_or_else(|| {
                    AppError::Internal(format!("Category {} vanished after conflict", name))
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Single-letter subcategory named after the first character of `item_name`.
    ///
    /// Failures are logged and yield `None`; the caller carries on without a
    /// subcategory.
    pub async fn get_alphabetical_subcategory(&self, category_id: Uuid, item_name: &str) -> Option<Uuid> {
        let Some(first) = item_name.trim_start().chars().next() else {
            tracing::warn!("Cannot derive alphabetical subcategory from an empty name");
            return None;
        };
        let letter: String = first.to_uppercase().collect();

        match self.find_or_create_subcategory(category_id, &letter).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Failed to auto-assign subcategory {}: {}", letter, e);
                None
            }
        }
    }

    async fn find_or_create_subcategory(&self, category_id: Uuid, name: &str) -> AppResult<Uuid> {
        if let Some(id) = self.store.find_subcategory(category_id, name).await? {
            return Ok(id);
        }

        match self
            .store
            .insert_subcategory(category_id, name, &name.to_lowercase())
            .await
        {
            Ok(id) => {
                tracing::info!("Created new alphabetical subcategory: {}", name);
                Ok(id)
            }
            Err(e) if e.is_conflict() => self
                .store
                .find_subcategory(category_id, name)
                .await?
                .ok_or_else(|| AppError::Internal(format!("Subcategory {} vanished after conflict", name))),
            Err(e) => Err(e),
        }
    }
}
