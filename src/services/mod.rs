//! Business logic services

pub mod catalog;
pub mod erpnext;
pub mod import_session;
pub mod importer;
pub mod mapping;
pub mod notifications;

use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::{
    config::{ErpnextConfig, ImportDefaults},
    error::AppResult,
    models::{ImportConfig, ImportProgress},
    repository::{CatalogStore, Repository},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    /// The operator's import session; operations take the lock exclusively
    pub import: Arc<Mutex<import_session::ImportSession>>,
    /// Progress of the running batch, readable without the session lock
    pub import_progress: watch::Receiver<ImportProgress>,
}

impl Services {
    /// Create all services with the given repository
    pub async fn new(
        repository: Repository,
        erpnext_config: ErpnextConfig,
        import_defaults: &ImportDefaults,
    ) -> AppResult<Self> {
        let store: Arc<dyn CatalogStore> = Arc::new(repository);
        let connector = Arc::new(erpnext::ErpnextConnector::new(erpnext_config)?);

        let mut session = import_session::ImportSession::new(
            connector,
            store.clone(),
            Arc::new(notifications::TracingNotifier),
            ImportConfig::from(import_defaults),
        );
        if let Err(e) = session.load_saved_rules().await {
            tracing::warn!("Could not load saved mapping rules: {}", e);
        }
        let import_progress = session.subscribe_progress();

        Ok(Self {
            catalog: catalog::CatalogService::new(store),
            import: Arc::new(Mutex::new(session)),
            import_progress,
        })
    }
}
