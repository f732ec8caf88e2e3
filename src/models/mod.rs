//! Data models for Materia

pub mod cart;
pub mod category;
pub mod import_report;
pub mod mapping_rule;
pub mod product;
pub mod remote_item;

// Re-export commonly used types
pub use category::{Category, CategoryTree, Subcategory};
pub use import_report::{ImportConfig, ImportProgress, ImportResult, MappingOutcome, PreviewItem};
pub use mapping_rule::{MappingRule, RuleMatcher};
pub use product::{ProductDraft, ProductType};
pub use remote_item::RemoteItem;
