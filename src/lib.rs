//! Shopme admin back-office: category, product, brand and settings
//! management screens over a relational store, with image uploads kept on
//! local disk.

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod services;
pub mod storage;
pub mod tracing;
pub mod views;

use axum::{
    extract::{DefaultBodyLimit, State},
    response::{Json, Redirect},
    routing::get,
    Router,
};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};

use crate::storage::{BRAND_LOGOS_DIR, CATEGORY_IMAGES_DIR, PRODUCT_IMAGES_DIR};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub storage: storage::FileStorage,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let storage = storage::FileStorage::new(config.upload_root());
        Self {
            services: handlers::AppServices::new(db.clone()),
            db,
            config,
            storage,
        }
    }
}

/// Admin screens, without static files or middleware
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/products") }))
        .route("/health", get(health_check))
        .nest("/categories", handlers::categories::categories_routes())
        .nest("/products", handlers::products::products_routes())
        .nest("/brands", handlers::brands::brands_routes())
        .nest("/settings", handlers::settings::settings_routes())
}

/// Complete application: admin screens, uploaded images and the middleware stack
pub fn app_router(state: AppState) -> Router {
    let root = state.storage.root().to_path_buf();
    let max_body_size = state.config.max_body_size;

    admin_routes()
        .nest_service(
            &format!("/{}", CATEGORY_IMAGES_DIR),
            ServeDir::new(root.join(CATEGORY_IMAGES_DIR)),
        )
        .nest_service(
            &format!("/{}", PRODUCT_IMAGES_DIR),
            ServeDir::new(root.join(PRODUCT_IMAGES_DIR)),
        )
        .nest_service(
            &format!("/{}", BRAND_LOGOS_DIR),
            ServeDir::new(root.join(BRAND_LOGOS_DIR)),
        )
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_size))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(_) => "unhealthy",
    };

    Json(json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "service": "shopme-admin",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub mod prelude {
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::services::*;
    pub use crate::storage::FileStorage;
    pub use crate::AppState;
}
