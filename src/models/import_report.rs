//! ERPNext import session models: preview, settings, progress and result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{mapping_rule::MappingRule, remote_item::RemoteItem};

/// Rule name recorded on an item whose category was picked by the operator
pub const MANUAL_ASSIGNMENT: &str = "Manual Assignment";

/// Category proposal produced by the mapping engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MappingOutcome {
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub rule_name: Option<String>,
    pub requires_manual_selection: bool,
}

/// Remote item annotated with its proposed local placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PreviewItem {
    #[serde(flatten)]
    pub item: RemoteItem,
    pub proposed_category_id: Option<Uuid>,
    pub proposed_subcategory_id: Option<Uuid>,
    pub mapping_rule: Option<String>,
    pub requires_manual_selection: bool,
}

impl PreviewItem {
    pub fn new(item: RemoteItem, outcome: MappingOutcome) -> Self {
        Self {
            item,
            proposed_category_id: outcome.category_id,
            proposed_subcategory_id: outcome.subcategory_id,
            mapping_rule: outcome.rule_name,
            requires_manual_selection: outcome.requires_manual_selection,
        }
    }

    /// Apply an operator override
    pub fn assign(&mut self, category_id: Uuid, subcategory_id: Option<Uuid>) {
        self.proposed_category_id = Some(category_id);
        self.proposed_subcategory_id = subcategory_id;
        self.mapping_rule = Some(MANUAL_ASSIGNMENT.to_string());
        self.requires_manual_selection = false;
    }
}

/// Session-scoped import settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImportConfig {
    pub update_existing: bool,
    pub create_categories: bool,
    pub import_disabled: bool,
    #[serde(default)]
    pub mapping_rules: Vec<MappingRule>,
}

impl From<&crate::config::ImportDefaults> for ImportConfig {
    fn from(defaults: &crate::config::ImportDefaults) -> Self {
        Self {
            update_existing: defaults.update_existing,
            create_categories: defaults.create_categories,
            import_disabled: defaults.import_disabled,
            mapping_rules: Vec::new(),
        }
    }
}

/// What happened to a single item during the batch upsert
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImportAction {
    Imported,
    Updated,
    Skipped,
}

/// Outcome of one import invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImportResult {
    pub success: bool,
    pub imported: u32,
    pub updated: u32,
    pub skipped: u32,
    pub errors: Vec<String>,
    pub finished_at: DateTime<Utc>,
}

impl ImportResult {
    /// Single-entry failure used when the batch itself could not complete
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            imported: 0,
            updated: 0,
            skipped: 0,
            errors: vec![message.into()],
            finished_at: Utc::now(),
        }
    }
}

/// Accumulates per-item outcomes into an [`ImportResult`]
#[derive(Debug, Default)]
pub struct ImportTally {
    imported: u32,
    updated: u32,
    skipped: u32,
    errors: Vec<String>,
}

impl ImportTally {
    pub fn record(&mut self, action: ImportAction) {
        match action {
            ImportAction::Imported => self.imported += 1,
            ImportAction::Updated => self.updated += 1,
            ImportAction::Skipped => self.skipped += 1,
        }
    }

    pub fn error(&mut self, message: String) {
        self.errors.push(message);
    }

    pub fn finish(self) -> ImportResult {
        ImportResult {
            success: self.errors.is_empty(),
            imported: self.imported,
            updated: self.updated,
            skipped: self.skipped,
            errors: self.errors,
            finished_at: Utc::now(),
        }
    }
}

/// Batch progress published after every processed item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImportProgress {
    pub processed: u32,
    pub total: u32,
    pub done: bool,
}

impl ImportProgress {
    pub fn start(total: u32) -> Self {
        Self { processed: 0, total, done: false }
    }

    /// Percentage, capped at 99 until the batch reports completion
    pub fn percent(&self) -> u8 {
        if self.done {
            return 100;
        }
        if self.total == 0 {
            return 0;
        }
        let pct = (u64::from(self.processed) * 100) / u64::from(self.total);
        pct.min(99) as u8
    }
}
