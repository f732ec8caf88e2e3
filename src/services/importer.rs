//! Batch upsert of confirmed ERPNext items into the local catalog

use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        import_report::{ImportAction, ImportTally},
        product::DEFAULT_TAX_CLASS,
        ImportConfig, ImportProgress, ImportResult, PreviewItem, ProductDraft, ProductType,
    },
    repository::CatalogStore,
    services::catalog::CatalogService,
};

#[derive(Clone)]
pub struct ImportService {
    store: Arc<dyn CatalogStore>,
    catalog: CatalogService,
}

impl ImportService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            catalog: CatalogService::new(store.clone()),
            store,
        }
    }

    /// Upsert every item, publishing progress after each one.
    ///
    /// Item outcomes are independent: a failure is recorded in the result's
    /// error list and the batch moves on. Writes done before a failure stay.
    pub async fn import_products(
        &self,
        items: &[PreviewItem],
        config: &ImportConfig,
        progress: &watch::Sender<ImportProgress>,
    ) -> ImportResult {
        let mut state = ImportProgress::start(items.len() as u32);
        progress.send_replace(state);

        let mut tally = ImportTally::default();
        for item in items {
            match self.import_one(item, config).await {
                Ok(action) => {
                    tracing::debug!("{} -> {:?}", item.item.item_code, action);
                    tally.record(action);
                }
                Err(e) => {
                    tracing::warn!("Failed to import {}: {}", item.item.item_code, e);
                    tally.error(format!("{}: {}", item.item.item_code, e));
                }
            }
            state.processed += 1;
            progress.send_replace(state);
        }

        state.done = true;
        progress.send_replace(state);

        let result = tally.finish();
        tracing::info!(
            "Import finished: {} imported, {} updated, {} skipped, {} errors",
            result.imported,
            result.updated,
            result.skipped,
            result.errors.len()
        );
        result
    }

    async fn import_one(&self, item: &PreviewItem, config: &ImportConfig) -> AppResult<ImportAction> {
        let existing = self.store.find_product(&item.item.item_code).await?;
        if existing.is_some() && !config.update_existing {
            return Ok(ImportAction::Skipped);
        }

        let draft = self.build_product(item, config).await;
        match existing {
            Some(id) => {
                self.store.update_product(id, &draft).await?;
                Ok(ImportAction::Updated)
            }
            None => {
                self.store.insert_product(&draft).await?;
                Ok(ImportAction::Imported)
            }
        }
    }

    /// Map a preview item onto local product fields, resolving missing
    /// categories from the ERPNext item group.
    async fn build_product(&self, preview: &PreviewItem, config: &ImportConfig) -> ProductDraft {
        let item = &preview.item;
        let mut category_id = preview.proposed_category_id;
        let mut subcategory_id = preview.proposed_subcategory_id;

        if category_id.is_none() && !item.item_group.is_empty() {
            category_id = self.resolve_group_category(&item.item_group, config).await;
        }

        if let (Some(category), None) = (category_id, subcategory_id) {
            subcategory_id = self
                .catalog
                .get_alphabetical_subcategory(category, &item.item_name)
                .await;
        }

        ProductDraft {
            erp_item_code: item.item_code.clone(),
            name: item.item_name.clone(),
            product_type: if item.has_variants {
                ProductType::Variable
            } else {
                ProductType::Simple
            },
            description: item.description.clone().unwrap_or_default(),
            hsn_code: item.hsn_code.clone().unwrap_or_else(|| item.item_code.clone()),
            price: item.standard_rate,
            stock: i32::try_from(item.opening_stock).unwrap_or(i32::MAX),
            weight: item.weight_per_unit,
            image: item.image.clone(),
            category_label: category_id
                .is_none()
                .then(|| item.item_group.clone())
                .filter(|g| !g.is_empty()),
            category_id,
            subcategory_id,
            tax_status: "taxable".to_string(),
            tax_class: DEFAULT_TAX_CLASS.to_string(),
        }
    }

    /// Lookup only when category creation is disabled
    async fn resolve_group_category(&self, group: &str, config: &ImportConfig) -> Option<Uuid> {
        let resolved = if config.create_categories {
            self.catalog.get_or_create_category(group).await.map(Some)
        } else {
            self.store.find_category(group).await
        };

        match resolved {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Failed to resolve category {}: {}", group, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::RemoteItem, repository::MockCatalogStore};
    use mockall::predicate::{always, eq};
    use rust_decimal::Decimal;

    fn preview(code: &str, name: &str, group: &str) -> PreviewItem {
        PreviewItem {
            item: RemoteItem {
                item_code: code.to_string(),
                item_name: name.to_string(),
                item_group: group.to_string(),
                description: None,
                standard_rate: Decimal::new(185, 0),
                opening_stock: 7,
                weight_per_unit: 0.05,
                hsn_code: None,
                image: None,
                has_variants: true,
            },
            proposed_category_id: None,
            proposed_subcategory_id: None,
            mapping_rule: None,
            requires_manual_selection: false,
        }
    }

    fn config(update_existing: bool, create_categories: bool) -> ImportConfig {
        ImportConfig {
            update_existing,
            create_categories,
            import_disabled: false,
            mapping_rules: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_existing_product_skipped_without_update() {
        let mut store = MockCatalogStore::new();
        store
            .expect_find_product()
            .with(eq("ARN-30"))
            .returning(|_| Ok(Some(Uuid::new_v4())));
        store.expect_update_product().never();
        store.expect_insert_product().never();

        let (tx, rx) = watch::channel(ImportProgress::default());
        let service = ImportService::new(Arc::new(store));
        let result = service
            .import_products(&[preview("ARN-30", "Arnica", "")], &config(false, true), &tx)
            .await;

        assert!(result.success);
        assert_eq!(result.skipped, 1);
        assert_eq!(*rx.borrow(), ImportProgress { processed: 1, total: 1, done: true });
    }

    #[tokio::test]
    async fn test_new_product_gets_group_category_and_letter() {
        let category = Uuid::new_v4();
        let letter = Uuid::new_v4();
        let mut store = MockCatalogStore::new();
        store.expect_find_product().returning(|_| Ok(None));
        store
            .expect_find_category()
            .with(eq("Tonics"))
            .returning(move |_| Ok(Some(category)));
        store
            .expect_find_subcategory()
            .with(eq(category), eq("A"))
            .returning(move |_, _| Ok(Some(letter)));
        store
            .expect_insert_product()
            .withf(move |p: &ProductDraft| {
                p.category_id == Some(category)
                    && p.subcategory_id == Some(letter)
                    && p.category_label.is_none()
                    && p.hsn_code == "ARN-30"
                    && p.product_type == ProductType::Variable
                    && p.stock == 7
            })
            .times(1)
            .returning(|_| Ok(Uuid::new_v4()));

        let (tx, _rx) = watch::channel(ImportProgress::default());
        let service = ImportService::new(Arc::new(store));
        let result = service
            .import_products(&[preview("ARN-30", "arnica", "Tonics")], &config(true, true), &tx)
            .await;

        assert!(result.success);
        assert_eq!(result.imported, 1);
    }

    #[tokio::test]
    async fn test_unknown_group_kept_as_label_when_creation_disabled() {
        let mut store = MockCatalogStore::new();
        store.expect_find_product().returning(|_| Ok(None));
        store.expect_find_category().returning(|_| Ok(None));
        store.expect_insert_category().never();
        store
            .expect_insert_product()
            .withf(|p: &ProductDraft| {
                p.category_id.is_none() && p.category_label.as_deref() == Some("Unsorted")
            })
            .returning(|_| Ok(Uuid::new_v4()));

        let (tx, _rx) = watch::channel(ImportProgress::default());
        let service = ImportService::new(Arc::new(store));
        let result = service
            .import_products(&[preview("X-1", "Xanthium", "Unsorted")], &config(true, false), &tx)
            .await;
        assert_eq!(result.imported, 1);
    }

    #[tokio::test]
    async fn test_existing_product_updated() {
        let id = Uuid::new_v4();
        let mut store = MockCatalogStore::new();
        store.expect_find_product().returning(move |_| Ok(Some(id)));
        store
            .expect_update_product()
            .with(eq(id), always())
            .times(1)
            .returning(|_, _| Ok(()));

        let (tx, _rx) = watch::channel(ImportProgress::default());
        let service = ImportService::new(Arc::new(store));
        let result = service
            .import_products(&[preview("N-1", "Nux", "")], &config(true, true), &tx)
            .await;
        assert_eq!(result.updated, 1);
    }
}
