//! Biblioteca library management server
//!
//! Catalog of books, authors and categories with stock-aware lending,
//! exposed as a REST JSON API and as server-rendered pages.

use std::sync::Arc;

use axum::Router;
use sqlx::{Pool, Postgres};
use tera::Tera;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod web;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub templates: Arc<Tera>,
}

impl AppState {
    /// Wire repositories, services and templates over a database pool
    pub fn new(config: AppConfig, pool: Pool<Postgres>) -> AppResult<Self> {
        let repository = repository::Repository::new(pool);
        let services = services::Services::new(repository, &config);
        let templates = web::templates()
            .map_err(|e| AppError::Internal(format!("Failed to load templates: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            services: Arc::new(services),
            templates: Arc::new(templates),
        })
    }
}

/// Create the application router with all routes
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/v1", api::router(state.clone()))
        .merge(api::openapi::create_openapi_router())
        .merge(web::router(state))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
