//! Materia Server - homeopathy storefront catalog
//!
//! REST API for the local catalog, the ERPNext import session and cart pricing.

use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use materia_server::{
    api,
    config::{AppConfig, LoggingConfig},
    repository::Repository,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    init_tracing(&config.logging);

    tracing::info!("Starting Materia Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Database migrations completed");

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(repository, config.erpnext.clone(), &config.import).await?;

    tracing::info!("ERPNext endpoint: {}", config.erpnext.base_url);

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("materia_server={},tower_http=debug", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Local catalog
        .route("/categories", get(api::categories::list_categories))
        // ERPNext import session
        .route("/erpnext/credentials", put(api::erpnext::update_credentials))
        .route("/erpnext/fetch", post(api::erpnext::fetch_items))
        .route("/erpnext/session", get(api::erpnext::get_session))
        .route("/erpnext/config", put(api::erpnext::update_settings))
        .route(
            "/erpnext/rules",
            get(api::erpnext::list_rules).put(api::erpnext::replace_rules),
        )
        .route("/erpnext/selection", post(api::erpnext::update_selection))
        .route(
            "/erpnext/items/:item_code/assignment",
            post(api::erpnext::assign_category),
        )
        .route("/erpnext/import", post(api::erpnext::run_import))
        .route("/erpnext/progress", get(api::erpnext::get_progress))
        .route("/erpnext/progress/stream", get(api::erpnext::progress_stream))
        // Cart
        .route("/cart/quote", post(api::cart::quote_cart))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
}
