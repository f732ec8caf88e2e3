//! ERPNext import session: fetch, map, preview, correct, import.
//!
//! One session per operator console. Every operation borrows the session
//! mutably, so rule edits and selections can never interleave with a fetch
//! or an import; the rule set is snapshotted when a fetch starts.

use std::sync::Arc;

use indexmap::IndexSet;
use serde::Serialize;
use tokio::sync::watch;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        mapping_rule::PRODUCT_RULE_PRIORITY, ImportConfig, ImportProgress, ImportResult,
        MappingRule, PreviewItem,
    },
    repository::CatalogStore,
    services::{
        erpnext::{ErpnextCredentials, ItemFilters, RemoteCatalog, RemoteCatalogConnector},
        importer::ImportService,
        mapping::{product_rule, PreparedRules},
        notifications::{Notification, Notifier},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Fetching,
    Previewing,
    Importing,
    Completed,
    Failed,
}

/// Read-only view of a session for the admin console
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub connected: bool,
    pub config: ImportConfig,
    pub items: Vec<PreviewItem>,
    pub selected: Vec<String>,
    pub requires_manual_selection: usize,
    pub last_result: Option<ImportResult>,
    pub last_notification: Option<Notification>,
}

pub struct ImportSession {
    state: SessionState,
    connector: Arc<dyn RemoteCatalogConnector>,
    remote: Option<Arc<dyn RemoteCatalog>>,
    store: Arc<dyn CatalogStore>,
    importer: ImportService,
    notifier: Arc<dyn Notifier>,
    config: ImportConfig,
    items: Vec<PreviewItem>,
    selected: IndexSet<String>,
    progress: Arc<watch::Sender<ImportProgress>>,
    last_result: Option<ImportResult>,
    last_notification: Option<Notification>,
}

impl ImportSession {
    pub fn new(
        connector: Arc<dyn RemoteCatalogConnector>,
        store: Arc<dyn CatalogStore>,
        notifier: Arc<dyn Notifier>,
        config: ImportConfig,
    ) -> Self {
        let (progress, _) = watch::channel(ImportProgress::default());
        Self {
            state: SessionState::Idle,
            connector,
            remote: None,
            importer: ImportService::new(store.clone()),
            store,
            notifier,
            config,
            items: Vec::new(),
            selected: IndexSet::new(),
            progress: Arc::new(progress),
            last_result: None,
            last_notification: None,
        }
    }

    /// Merge previously saved rules into the session rule set
    pub async fn load_saved_rules(&mut self) -> AppResult<usize> {
        let saved = self.store.list_mapping_rules().await?;
        let count = saved.len();
        for rule in saved {
            upsert_rule(&mut self.config.mapping_rules, rule);
        }
        tracing::info!("Loaded {} saved mapping rules", count);
        Ok(count)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn items(&self) -> &[PreviewItem] {
        &self.items
    }

    pub fn selected(&self) -> &IndexSet<String> {
        &self.selected
    }

    pub fn last_result(&self) -> Option<&ImportResult> {
        self.last_result.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.remote.as_ref().is_some_and(|r| r.is_configured())
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<ImportProgress> {
        self.progress.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            connected: self.is_connected(),
            config: self.config.clone(),
            items: self.items.clone(),
            selected: self.selected.iter().cloned().collect(),
            requires_manual_selection: self.manual_count(),
            last_result: self.last_result.clone(),
            last_notification: self.last_notification.clone(),
        }
    }

    /// Replace the ERPNext credentials; a fresh client is built for them
    pub fn update_credentials(&mut self, username: &str, password: &str) -> AppResult<bool> {
        self.ensure_not_busy()?;
        let remote = self
            .connector
            .connect(ErpnextCredentials::new(username.trim(), password));
        self.remote = Some(remote);
        Ok(self.is_connected())
    }

    pub fn update_settings(&mut self, update_existing: bool, create_categories: bool, import_disabled: bool) -> AppResult<()> {
        self.ensure_not_busy()?;
        self.config.update_existing = update_existing;
        self.config.create_categories = create_categories;
        self.config.import_disabled = import_disabled;
        Ok(())
    }

    /// Fetch remote items and map them into preview items, all selected.
    pub async fn fetch_items(&mut self) -> AppResult<usize> {
        self.ensure_not_busy()?;
        self.state = SessionState::Connecting;

        let Some(remote) = self.remote.clone().filter(|r| r.is_configured()) else {
            self.state = SessionState::Idle;
            self.notify(Notification::destructive(
                "Credentials required",
                "Please enter your ERPNext username and password first.",
            ));
            return Err(AppError::Configuration(
                "ERPNext credentials are required".to_string(),
            ));
        };

        self.state = SessionState::Fetching;
        let rules = PreparedRules::new(&self.config.mapping_rules);
        let filters = self.filters();
        tracing::info!("Fetching ERPNext items with {} usable rules", rules.len());

        match remote.fetch_items(&filters).await {
            Ok(fetched) => {
                self.items = fetched
                    .into_iter()
                    .map(|item| {
                        let outcome = rules.apply(&item);
                        PreviewItem::new(item, outcome)
                    })
                    .collect();
                self.selected = self.items.iter().map(|i| i.item.item_code.clone()).collect();
                self.state = SessionState::Previewing;

                let count = self.items.len();
                self.notify(Notification::info(
                    "Items loaded",
                    format!(
                        "Successfully loaded {} items. {} items require manual subcategory selection.",
                        count,
                        self.manual_count()
                    ),
                ));
                Ok(count)
            }
            Err(e) => {
                self.items.clear();
                self.selected.clear();
                self.state = SessionState::Idle;
                self.notify(Notification::destructive("Failed to load items", describe(&e)));
                Err(e)
            }
        }
    }

    pub fn select_all(&mut self, checked: bool) -> AppResult<()> {
        self.ensure_not_busy()?;
        self.selected = if checked {
            self.items.iter().map(|i| i.item.item_code.clone()).collect()
        } else {
            IndexSet::new()
        };
        Ok(())
    }

    pub fn select_item(&mut self, item_code: &str, checked: bool) -> AppResult<()> {
        self.ensure_not_busy()?;
        if !self.items.iter().any(|i| i.item.item_code == item_code) {
            return Err(AppError::NotFound(format!("Item {} is not in the preview", item_code)));
        }
        if checked {
            self.selected.insert(item_code.to_string());
        } else {
            self.selected.shift_remove(item_code);
        }
        Ok(())
    }

    /// Operator override of an item's placement.
    ///
    /// Also records a rule pinning this item code so the next fetch resolves
    /// it on its own. Failing to persist the rule is logged, not fatal.
    pub async fn assign_category(
        &mut self,
        item_code: &str,
        category_id: Uuid,
        subcategory_id: Option<Uuid>,
    ) -> AppResult<MappingRule> {
        self.ensure_not_busy()?;
        let item = self
            .items
            .iter_mut()
            .find(|i| i.item.item_code == item_code)
            .ok_or_else(|| AppError::NotFound(format!("Item {} is not in the preview", item_code)))?;

        item.assign(category_id, subcategory_id);
        let rule = product_rule(item_code, &item.item.item_name, category_id, subcategory_id);
        upsert_rule(&mut self.config.mapping_rules, rule.clone());

        if let Err(e) = self.store.save_mapping_rule(&rule).await {
            tracing::warn!("Failed to save mapping rule {}: {}", rule.id, e);
        } else {
            tracing::info!("Saved mapping rule for {}", item_code);
        }
        Ok(rule)
    }

    /// Replace the session rule set
    pub fn set_mapping_rules(&mut self, rules: Vec<MappingRule>) -> AppResult<()> {
        self.ensure_not_busy()?;

        let mut ids = IndexSet::new();
        for rule in &rules {
            if !ids.insert(rule.id.as_str()) {
                return Err(AppError::Validation(format!("Duplicate rule id {}", rule.id)));
            }
            if rule.matcher.is_blank() {
                return Err(AppError::Validation(format!(
                    "Rule {} has a blank {}",
                    rule.id,
                    rule.matcher.kind()
                )));
            }
            if !rule.is_product_rule() && rule.priority >= PRODUCT_RULE_PRIORITY {
                return Err(AppError::Validation(format!(
                    "Rule {} priority must be below {}",
                    rule.id, PRODUCT_RULE_PRIORITY
                )));
            }
        }

        self.config.mapping_rules = rules;
        Ok(())
    }

    /// Upsert the selected items and record the result.
    ///
    /// Per-item failures still complete the session; only a crash of the
    /// batch task itself moves it to `Failed`.
    pub async fn import(&mut self) -> AppResult<ImportResult> {
        self.ensure_not_busy()?;
        if self.selected.is_empty() {
            self.notify(Notification::destructive(
                "No items selected",
                "Please select at least one item to import.",
            ));
            return Err(AppError::Validation("No items selected".to_string()));
        }

        let batch: Vec<PreviewItem> = self
            .items
            .iter()
            .filter(|i| self.selected.contains(&i.item.item_code))
            .cloned()
            .collect();

        tracing::info!("Starting import of {} selected items", batch.len());
        self.state = SessionState::Importing;
        self.last_result = None;
        self.progress.send_replace(ImportProgress::start(batch.len() as u32));

        let importer = self.importer.clone();
        let config = self.config.clone();
        let progress = self.progress.clone();
        let handle = tokio::spawn(async move {
            importer.import_products(&batch, &config, &progress).await
        });

        let result = match handle.await {
            Ok(result) => {
                self.state = SessionState::Completed;
                if result.success {
                    self.notify(Notification::info(
                        "Import completed",
                        format!(
                            "Successfully imported {} products and updated {} products.",
                            result.imported, result.updated
                        ),
                    ));
                } else {
                    self.notify(Notification::destructive(
                        "Import completed with errors",
                        format!("{} errors occurred during import.", result.errors.len()),
                    ));
                }
                result
            }
            Err(e) => {
                let message = if e.is_panic() {
                    panic_message(e.into_panic())
                } else {
                    e.to_string()
                };
                tracing::error!("Import task failed: {}", message);
                self.state = SessionState::Failed;
                self.progress.send_modify(|p| p.done = true);
                self.notify(Notification::destructive("Import failed", message.clone()));
                ImportResult::failed(message)
            }
        };

        self.last_result = Some(result.clone());
        Ok(result)
    }

    /// Bring the session back to rest after a transition was torn down
    /// mid-flight, e.g. by a panic in the task running it.
    pub fn recover(&mut self) {
        match self.state {
            SessionState::Connecting | SessionState::Fetching => {
                tracing::warn!("Fetch aborted, session reset to idle");
                self.items.clear();
                self.selected.clear();
                self.state = SessionState::Idle;
            }
            SessionState::Importing => {
                tracing::warn!("Import aborted, session marked failed");
                self.state = SessionState::Failed;
                self.progress.send_modify(|p| p.done = true);
            }
            _ => {}
        }
    }

    fn filters(&self) -> ItemFilters {
        let mut filters = ItemFilters::new();
        if !self.config.import_disabled {
            filters.insert("disabled".to_string(), serde_json::json!(0));
        }
        filters
    }

    fn manual_count(&self) -> usize {
        self.items.iter().filter(|i| i.requires_manual_selection).count()
    }

    fn ensure_not_busy(&self) -> AppResult<()> {
        match self.state {
            SessionState::Connecting | SessionState::Fetching | SessionState::Importing => Err(
                AppError::Busy(format!("Import session is {:?}", self.state).to_lowercase()),
            ),
            _ => Ok(()),
        }
    }

    fn notify(&mut self, notification: Notification) {
        self.notifier.notify(notification.clone());
        self.last_notification = Some(notification);
    }
}

fn upsert_rule(rules: &mut Vec<MappingRule>, rule: MappingRule) {
    match rules.iter_mut().find(|r| r.id == rule.id) {
        Some(existing) => *existing = rule,
        None => rules.push(rule),
    }
}

/// ERPNext failures are shown verbatim
fn describe(e: &AppError) -> String {
    match e {
        AppError::Erpnext(msg) | AppError::Configuration(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown error occurred".to_string()
    }
}
