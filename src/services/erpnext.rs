//! ERPNext REST client for the remote item catalog
//!
//! Credentials are an explicit value handed to [`ErpnextClient::new`]; each
//! import session builds its own client through a [`RemoteCatalogConnector`],
//! so nothing is shared between sessions.

use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    config::ErpnextConfig,
    error::{AppError, AppResult},
    models::{remote_item::{ErpnextItemRecord, ERPNEXT_ITEM_FIELDS}, RemoteItem},
};

/// Field name to required value, e.g. `disabled = 0`
pub type ItemFilters = BTreeMap<String, serde_json::Value>;

#[derive(Clone, Default)]
pub struct ErpnextCredentials {
    pub username: String,
    pub password: String,
}

impl ErpnextCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for ErpnextCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErpnextCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Remote catalog the import pipeline reads from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// True once both username and password are set
    fn is_configured(&self) -> bool;

    /// List items matching every filter; an empty filter set lists everything
    /// visible to the account. No retry is attempted.
    async fn fetch_items(&self, filters: &ItemFilters) -> AppResult<Vec<RemoteItem>>;
}

/// Builds a [`RemoteCatalog`] for a given set of credentials
pub trait RemoteCatalogConnector: Send + Sync {
    fn connect(&self, credentials: ErpnextCredentials) -> Arc<dyn RemoteCatalog>;
}

#[derive(Debug, Deserialize)]
struct ErpnextListResponse<T> {
    data: Vec<T>,
}

/// HTTP client for one ERPNext site
#[derive(Clone)]
pub struct ErpnextClient {
    http: reqwest::Client,
    config: ErpnextConfig,
    credentials: ErpnextCredentials,
}

impl ErpnextClient {
    pub fn new(http: reqwest::Client, config: ErpnextConfig, credentials: ErpnextCredentials) -> Self {
        Self { http, config, credentials }
    }

    fn items_url(&self) -> String {
        format!("{}/api/resource/Item", self.config.base_url.trim_end_matches('/'))
    }
}

/// Encode filters the way the resource API expects: `[["field","=",value],...]`
pub fn filters_param(filters: &ItemFilters) -> String {
    let list: Vec<serde_json::Value> = filters
        .iter()
        .map(|(field, value)| serde_json::json!([field, "=", value]))
        .collect();
    serde_json::Value::Array(list).to_string()
}

#[async_trait]
impl RemoteCatalog for ErpnextClient {
    fn is_configured(&self) -> bool {
        self.credentials.is_complete()
    }

    async fn fetch_items(&self, filters: &ItemFilters) -> AppResult<Vec<RemoteItem>> {
        if !self.is_configured() {
            return Err(AppError::Configuration(
                "ERPNext username and password are required".to_string(),
            ));
        }

        let fields = serde_json::to_string(ERPNEXT_ITEM_FIELDS)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let query = [
            ("fields", fields),
            ("filters", filters_param(filters)),
            ("limit_page_length", self.config.page_length.to_string()),
        ];

        tracing::debug!("ERPNext item query: {:?}", query);

        let response = self
            .http
            .get(self.items_url())
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("ERPNext request failed: {}", e);
                AppError::Erpnext(format!("Failed to reach ERPNext: {}", e))
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::Erpnext(format!(
                "ERPNext rejected the credentials ({})",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Erpnext(format!("ERPNext returned {}: {}", status, body)));
        }

        let body: ErpnextListResponse<ErpnextItemRecord> = response
            .json()
            .await
            .map_err(|e| AppError::Erpnext(format!("Invalid ERPNext item list: {}", e)))?;

        let total = body.data.len();
        let items: Vec<RemoteItem> = body
            .data
            .into_iter()
            .filter_map(|record| match RemoteItem::try_from(record) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!("Dropping ERPNext record: {}", e);
                    None
                }
            })
            .collect();

        tracing::info!("Fetched {} ERPNext items ({} dropped)", items.len(), total - items.len());
        Ok(items)
    }
}

/// Connector producing [`ErpnextClient`]s that share one connection pool
#[derive(Clone)]
pub struct ErpnextConnector {
    http: reqwest::Client,
    config: ErpnextConfig,
}

impl ErpnextConnector {
    pub fn new(config: ErpnextConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }
}

impl RemoteCatalogConnector for ErpnextConnector {
    fn connect(&self, credentials: ErpnextCredentials) -> Arc<dyn RemoteCatalog> {
        Arc::new(ErpnextClient::new(self.http.clone(), self.config.clone(), credentials))
    }
}
