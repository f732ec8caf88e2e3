//! Materia storefront server
//!
//! Catalog backend for a homeopathy storefront: imports items from ERPNext,
//! maps them onto local categories with operator-reviewed rules, and prices
//! carts for the storefront.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
