//! ERPNext import session endpoints

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{ImportProgress, ImportResult, MappingRule},
    services::import_session::SessionSnapshot,
};

use super::{detached, lock_session};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CredentialsRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectionResponse {
    pub connected: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImportSettingsRequest {
    pub update_existing: bool,
    pub create_categories: bool,
    pub import_disabled: bool,
}

/// Toggle one item, or every item when `item_code` is omitted
#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectionRequest {
    pub item_code: Option<String>,
    pub checked: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignmentRequest {
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressResponse {
    pub processed: u32,
    pub total: u32,
    pub percent: u8,
    pub done: bool,
}

impl From<ImportProgress> for ProgressResponse {
    fn from(p: ImportProgress) -> Self {
        Self {
            processed: p.processed,
            total: p.total,
            percent: p.percent(),
            done: p.done,
        }
    }
}

/// Set the ERPNext credentials for this session
#[utoipa::path(
    put,
    path = "/erpnext/credentials",
    tag = "erpnext",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Credentials stored", body = ConnectionResponse),
        (status = 409, description = "Session busy")
    )
)]
pub async fn update_credentials(
    State(state): State<crate::AppState>,
    Json(request): Json<CredentialsRequest>,
) -> AppResult<Json<ConnectionResponse>> {
    request.validate()?;
    let mut session = lock_session(&state)?;
    let connected = session.update_credentials(&request.username, &request.password)?;
    Ok(Json(ConnectionResponse { connected }))
}

/// Fetch items from ERPNext and build the preview
#[utoipa::path(
    post,
    path = "/erpnext/fetch",
    tag = "erpnext",
    responses(
        (status = 200, description = "Preview ready", body = SessionSnapshot),
        (status = 428, description = "Credentials required"),
        (status = 502, description = "ERPNext error")
    )
)]
pub async fn fetch_items(State(state): State<crate::AppState>) -> AppResult<Json<SessionSnapshot>> {
    let mut session = lock_session(&state)?;
    let snapshot = detached(&state.services.import, async move {
        session.fetch_items().await?;
        Ok(session.snapshot())
    })
    .await?;
    Ok(Json(snapshot))
}

/// Current session state, preview and last result
#[utoipa::path(
    get,
    path = "/erpnext/session",
    tag = "erpnext",
    responses(
        (status = 200, description = "Session snapshot", body = SessionSnapshot),
        (status = 409, description = "Session busy")
    )
)]
pub async fn get_session(State(state): State<crate::AppState>) -> AppResult<Json<SessionSnapshot>> {
    let session = lock_session(&state)?;
    Ok(Json(session.snapshot()))
}

/// Update import settings
#[utoipa::path(
    put,
    path = "/erpnext/config",
    tag = "erpnext",
    request_body = ImportSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = SessionSnapshot)
    )
)]
pub async fn update_settings(
    State(state): State<crate::AppState>,
    Json(request): Json<ImportSettingsRequest>,
) -> AppResult<Json<SessionSnapshot>> {
    let mut session = lock_session(&state)?;
    session.update_settings(
        request.update_existing,
        request.create_categories,
        request.import_disabled,
    )?;
    Ok(Json(session.snapshot()))
}

/// Mapping rules of the session
#[utoipa::path(
    get,
    path = "/erpnext/rules",
    tag = "erpnext",
    responses(
        (status = 200, description = "Mapping rules", body = Vec<MappingRule>)
    )
)]
pub async fn list_rules(State(state): State<crate::AppState>) -> AppResult<Json<Vec<MappingRule>>> {
    let session = lock_session(&state)?;
    Ok(Json(session.config().mapping_rules.clone()))
}

/// Replace the mapping rules; takes effect on the next fetch
#[utoipa::path(
    put,
    path = "/erpnext/rules",
    tag = "erpnext",
    request_body = Vec<MappingRule>,
    responses(
        (status = 200, description = "Rules replaced", body = Vec<MappingRule>),
        (status = 400, description = "Invalid rule set")
    )
)]
pub async fn replace_rules(
    State(state): State<crate::AppState>,
    Json(rules): Json<Vec<MappingRule>>,
) -> AppResult<Json<Vec<MappingRule>>> {
    let mut session = lock_session(&state)?;
    session.set_mapping_rules(rules)?;
    Ok(Json(session.config().mapping_rules.clone()))
}

/// Select or deselect preview items
#[utoipa::path(
    post,
    path = "/erpnext/selection",
    tag = "erpnext",
    request_body = SelectionRequest,
    responses(
        (status = 200, description = "Selection updated", body = SessionSnapshot),
        (status = 404, description = "Item not in preview")
    )
)]
pub async fn update_selection(
    State(state): State<crate::AppState>,
    Json(request): Json<SelectionRequest>,
) -> AppResult<Json<SessionSnapshot>> {
    let mut session = lock_session(&state)?;
    match request.item_code {
        Some(code) => session.select_item(&code, request.checked)?,
        None => session.select_all(request.checked)?,
    }
    Ok(Json(session.snapshot()))
}

/// Manually assign an item's category; also saves a rule for the item
#[utoipa::path(
    post,
    path = "/erpnext/items/{item_code}/assignment",
    tag = "erpnext",
    params(("item_code" = String, Path, description = "ERPNext item code")),
    request_body = AssignmentRequest,
    responses(
        (status = 200, description = "Assignment stored", body = MappingRule),
        (status = 404, description = "Item not in preview")
    )
)]
pub async fn assign_category(
    State(state): State<crate::AppState>,
    Path(item_code): Path<String>,
    Json(request): Json<AssignmentRequest>,
) -> AppResult<Json<MappingRule>> {
    let mut session = lock_session(&state)?;
    let rule = detached(&state.services.import, async move {
        session
            .assign_category(&item_code, request.category_id, request.subcategory_id)
            .await
    })
    .await?;
    Ok(Json(rule))
}

/// Import the selected items
#[utoipa::path(
    post,
    path = "/erpnext/import",
    tag = "erpnext",
    responses(
        (status = 200, description = "Import finished", body = ImportResult),
        (status = 400, description = "No items selected"),
        (status = 409, description = "Session busy")
    )
)]
pub async fn run_import(State(state): State<crate::AppState>) -> AppResult<Json<ImportResult>> {
    let mut session = lock_session(&state)?;
    let result = detached(&state.services.import, async move { session.import().await }).await?;
    Ok(Json(result))
}

/// Progress of the running import
#[utoipa::path(
    get,
    path = "/erpnext/progress",
    tag = "erpnext",
    responses(
        (status = 200, description = "Import progress", body = ProgressResponse)
    )
)]
pub async fn get_progress(State(state): State<crate::AppState>) -> Json<ProgressResponse> {
    let progress = *state.services.import_progress.borrow();
    Json(progress.into())
}

/// Server-sent events carrying import progress
pub async fn progress_stream(
    State(state): State<crate::AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(state.services.import_progress.clone()).map(|progress| {
        let body = ProgressResponse::from(progress);
        Ok(Event::default()
            .event("progress")
            .json_data(&body)
            .unwrap_or_else(|_| Event::default().event("progress")))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
