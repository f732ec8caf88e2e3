//! In-memory fakes for exercising the import pipeline without Postgres or ERPNext

#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use materia_server::{
    error::{AppError, AppResult},
    models::{
        Category, CategoryTree, ImportConfig, MappingRule, ProductDraft,
        RemoteItem, Subcategory,
    },
    repository::CatalogStore,
    services::{
        erpnext::{ErpnextCredentials, ItemFilters, RemoteCatalog, RemoteCatalogConnector},
        import_session::ImportSession,
        notifications::{Notification, Notifier},
    },
};

#[derive(Default)]
struct StoreState {
    categories: Vec<Category>,
    subcategories: Vec<Subcategory>,
    products: HashMap<String, (Uuid, ProductDraft)>,
    rules: Vec<MappingRule>,
}

/// Catalog store backed by plain maps
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    /// Item codes whose product write fails
    pub failing_codes: HashSet<String>,
    /// Item codes whose product write panics
    pub panicking_codes: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(codes: &[&str]) -> Self {
        Self {
            failing_codes: codes.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn panicking(codes: &[&str]) -> Self {
        Self {
            panicking_codes: codes.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn category_count(&self) -> usize {
        self.state.lock().unwrap().categories.len()
    }

    pub fn subcategory(&self, id: Uuid) -> Option<Subcategory> {
        let state = self.state.lock().unwrap();
        state.subcategories.iter().find(|s| s.id == id).cloned()
    }

    pub fn product(&self, code: &str) -> Option<ProductDraft> {
        let state = self.state.lock().unwrap();
        state.products.get(code).map(|(_, p)| p.clone())
    }

    pub fn product_count(&self) -> usize {
        self.state.lock().unwrap().products.len()
    }

    pub fn saved_rules(&self) -> Vec<MappingRule> {
        self.state.lock().unwrap().rules.clone()
    }

    fn check_write(&self, code: &str) -> AppResult<()> {
        if self.panicking_codes.contains(code) {
            panic!("storage crashed while writing {}", code);
        }
        if self.failing_codes.contains(code) {
            return Err(AppError::Internal("write rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_category(&self, name: &str) -> AppResult<Option<Uuid>> {
        let found = {
            let state = self.state.lock().unwrap();
            state.categories.iter().find(|c| c.name == name).map(|c| c.id)
        };
        // Let a concurrent caller observe the same miss
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn insert_category(&self, name: &str, slug: &str) -> AppResult<Uuid> {
        let mut state = self.state.lock().unwrap();
        if state.categories.iter().any(|c| c.name == name) {
            return Err(AppError::Conflict(format!("Category {} already exists", name)));
        }
        let id = Uuid::new_v4();
        state.categories.push(Category {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
        });
        Ok(id)
    }

    async fn find_subcategory(&self, category_id: Uuid, name: &str) -> AppResult<Option<Uuid>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .subcategories
            .iter()
            .find(|s| s.category_id == category_id && s.name == name)
            .map(|s| s.id))
    }

    async fn insert_subcategory(&self, category_id: Uuid, name: &str, slug: &str) -> AppResult<Uuid> {
        let mut state = self.state.lock().unwrap();
        if state
            .subcategories
            .iter()
            .any(|s| s.category_id == category_id && s.name == name)
        {
            return Err(AppError::Conflict(format!("Subcategory {} already exists", name)));
        }
        let id = Uuid::new_v4();
        state.subcategories.push(Subcategory {
            id,
            category_id,
            name: name.to_string(),
            slug: slug.to_string(),
        });
        Ok(id)
    }

    async fn list_categories(&self) -> AppResult<Vec<CategoryTree>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .categories
            .iter()
            .map(|c| CategoryTree {
                category: c.clone(),
                subcategories: state
                    .subcategories
                    .iter()
                    .filter(|s| s.category_id == c.id)
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    async fn find_product(&self, erp_item_code: &str) -> AppResult<Option<Uuid>> {
        let state = self.state.lock().unwrap();
        Ok(state.products.get(erp_item_code).map(|(id, _)| *id))
    }

    async fn insert_product(&self, product: &ProductDraft) -> AppResult<Uuid> {
        self.check_write(&product.erp_item_code)?;
        let mut state = self.state.lock().unwrap();
        let id = Uuid::new_v4();
        state
            .products
            .insert(product.erp_item_code.clone(), (id, product.clone()));
        Ok(id)
    }

    async fn update_product(&self, id: Uuid, product: &ProductDraft) -> AppResult<()> {
        self.check_write(&product.erp_item_code)?;
        let mut state = self.state.lock().unwrap();
        state
            .products
            .insert(product.erp_item_code.clone(), (id, product.clone()));
        Ok(())
    }

    async fn list_mapping_rules(&self) -> AppResult<Vec<MappingRule>> {
        Ok(self.state.lock().unwrap().rules.clone())
    }

    async fn save_mapping_rule(&self, rule: &MappingRule) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        state.rules.retain(|r| r.id != rule.id);
        state.rules.push(rule.clone());
        Ok(())
    }
}

/// Remote catalog returning a canned response
pub struct FakeRemote {
    configured: bool,
    response: Result<Vec<RemoteItem>, String>,
    pub seen_filters: Mutex<Vec<ItemFilters>>,
}

#[async_trait]
impl RemoteCatalog for FakeRemote {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn fetch_items(&self, filters: &ItemFilters) -> AppResult<Vec<RemoteItem>> {
        self.seen_filters.lock().unwrap().push(filters.clone());
        self.response.clone().map_err(AppError::Erpnext)
    }
}

pub struct FakeConnector {
    response: Result<Vec<RemoteItem>, String>,
    pub last_remote: Mutex<Option<Arc<FakeRemote>>>,
}

impl FakeConnector {
    pub fn serving(items: Vec<RemoteItem>) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(items),
            last_remote: Mutex::new(None),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Err(message.to_string()),
            last_remote: Mutex::new(None),
        })
    }
}

impl RemoteCatalogConnector for FakeConnector {
    fn connect(&self, credentials: ErpnextCredentials) -> Arc<dyn RemoteCatalog> {
        let remote = Arc::new(FakeRemote {
            configured: credentials.is_complete(),
            response: self.response.clone(),
            seen_filters: Mutex::new(Vec::new()),
        });
        *self.last_remote.lock().unwrap() = Some(remote.clone());
        remote
    }
}

/// Notifier keeping every notification for assertions
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|n| n.title.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

pub fn item(code: &str, name: &str, group: &str) -> RemoteItem {
    RemoteItem {
        item_code: code.to_string(),
        item_name: name.to_string(),
        item_group: group.to_string(),
        description: Some(format!("{} mother tincture", name)),
        standard_rate: Decimal::new(12050, 2),
        opening_stock: 10,
        weight_per_unit: 0.1,
        hsn_code: None,
        image: None,
        has_variants: false,
    }
}

pub fn default_config() -> ImportConfig {
    ImportConfig {
        update_existing: true,
        create_categories: true,
        import_disabled: false,
        mapping_rules: Vec::new(),
    }
}

pub fn session(
    connector: Arc<dyn RemoteCatalogConnector>,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
    config: ImportConfig,
) -> ImportSession {
    ImportSession::new(connector, store, notifier, config)
}
