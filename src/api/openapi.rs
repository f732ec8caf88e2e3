//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::{cart, categories, erpnext, health},
    error::ErrorResponse,
    models::{
        cart::{CartLine, CartTotals},
        import_report::ImportAction,
        Category, CategoryTree, ImportConfig, ImportResult, MappingRule, PreviewItem, RemoteItem,
        RuleMatcher, Subcategory,
    },
    services::{
        import_session::{SessionSnapshot, SessionState},
        notifications::{Notification, Severity},
    },
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Materia API",
        version = "0.1.0",
        description = "Homeopathy storefront catalog and ERPNext import API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Categories
        categories::list_categories,
        // ERPNext import
        erpnext::update_credentials,
        erpnext::fetch_items,
        erpnext::get_session,
        erpnext::update_settings,
        erpnext::list_rules,
        erpnext::replace_rules,
        erpnext::update_selection,
        erpnext::assign_category,
        erpnext::run_import,
        erpnext::get_progress,
        // Cart
        cart::quote_cart,
    ),
    components(
        schemas(
            ErrorResponse,
            health::HealthResponse,
            Category,
            Subcategory,
            CategoryTree,
            RemoteItem,
            PreviewItem,
            MappingRule,
            RuleMatcher,
            ImportConfig,
            ImportResult,
            ImportAction,
            SessionSnapshot,
            SessionState,
            Notification,
            Severity,
            erpnext::CredentialsRequest,
            erpnext::ConnectionResponse,
            erpnext::ImportSettingsRequest,
            erpnext::SelectionRequest,
            erpnext::AssignmentRequest,
            erpnext::ProgressResponse,
            cart::CartQuoteRequest,
            CartLine,
            CartTotals,
        )
    ),
    tags(
        (name = "health", description = "Health checks"),
        (name = "categories", description = "Local catalog categories"),
        (name = "erpnext", description = "ERPNext import session"),
        (name = "cart", description = "Storefront cart pricing"),
    )
)]
pub struct ApiDoc;

/// Create OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
