use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::{response::IntoResponse, routing::get, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::app_state::AppState;
use crate::config::Settings;

/// Build the main application router
pub fn app_router(settings: &Settings) -> Router<AppState> {
    Router::new()
        // Root route
        .route("/", get(root))
        // Health check (no auth required)
        .route("/health", get(health_check))
        // Authenticated API
        .nest("/api/v1", crate::api::routes::api_routes())
        // Fallback handler for 404
        .fallback(handler_404)
        .layer(cors_layer(settings))
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    if settings.allowed_origins.is_empty() {
        warn!("ALLOWED_ORIGINS not set, defaulting to wildcard (*)");
        return CorsLayer::very_permissive();
    }

    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

// Handler for root
async fn root() -> &'static str {
    "Server is running!"
}

// Handler for health check
async fn health_check() -> &'static str {
    "OK"
}

// Handler for 404 Not Found
async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        "The requested resource was not found",
    )
}
