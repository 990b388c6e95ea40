//! HTTP API surface.

mod routes;

use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::db::Db;
use crate::push::Dispatcher;

/// Shared app state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Db>,
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<Config>,
}

pub fn router(state: AppState) -> Router {
    // Credentialed CORS requires an explicit origin list, never a wildcard.
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health))
        .nest("/api", routes::api_routes())
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
