//! API handlers for Materia REST endpoints

pub mod cart;
pub mod categories;
pub mod erpnext;
pub mod health;
pub mod openapi;

use std::{future::Future, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::{AppError, AppResult},
    services::import_session::ImportSession,
    AppState,
};

/// Take the import session without waiting; a concurrent operation is a 409
pub(crate) fn lock_session(state: &AppState) -> AppResult<OwnedMutexGuard<ImportSession>> {
    state
        .services
        .import
        .clone()
        .try_lock_owned()
        .map_err(|_| AppError::Busy("Another import session operation is in progress".to_string()))
}

/// Run a session transition on its own task so a dropped request cannot
/// leave the session stuck mid-transition. If the task crashes, the session
/// is brought back to rest before the error is returned.
pub(crate) async fn detached<T, F>(session: &Arc<Mutex<ImportSession>>, operation: F) -> AppResult<T>
where
    T: Send + 'static,
    F: Future<Output = AppResult<T>> + Send + 'static,
{
    match tokio::spawn(operation).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Session task failed: {}", e);
            session.lock().await.recover();
            Err(AppError::Internal(format!("Session task failed: {}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::ImportConfig,
        repository::MockCatalogStore,
        services::{
            erpnext::{ErpnextCredentials, MockRemoteCatalog, RemoteCatalog, RemoteCatalogConnector},
            import_session::SessionState,
            notifications::TracingNotifier,
        },
    };

    struct CrashingConnector;

    impl RemoteCatalogConnector for CrashingConnector {
        fn connect(&self, _credentials: ErpnextCredentials) -> Arc<dyn RemoteCatalog> {
            let mut remote = MockRemoteCatalog::new();
            remote.expect_is_configured().return_const(true);
            remote
                .expect_fetch_items()
                .returning(|_| panic!("connection reset mid-response"));
            Arc::new(remote)
        }
    }

    #[tokio::test]
    async fn test_crashed_fetch_releases_session() {
        let session = ImportSession::new(
            Arc::new(CrashingConnector),
            Arc::new(MockCatalogStore::new()),
            Arc::new(TracingNotifier),
            ImportConfig {
                update_existing: true,
                create_categories: true,
                import_disabled: false,
                mapping_rules: Vec::new(),
            },
        );
        let session = Arc::new(Mutex::new(session));
        session.lock().await.update_credentials("admin", "secret").unwrap();

        let mut guard = session.clone().try_lock_owned().unwrap();
        let err = detached(&session, async move { guard.fetch_items().await })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        let mut resting = session.try_lock().unwrap();
        assert_eq!(resting.state(), SessionState::Idle);
        // Not stuck behind the busy guard
        resting.update_settings(false, false, false).unwrap();
    }
}
