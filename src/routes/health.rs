use axum::{routing::get, Json, Router};

use crate::models::{EndpointInfo, HealthResponse, InfoResponse};

pub fn router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}

/// Service info
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service info", body = InfoResponse)),
    tag = "meta"
)]
pub async fn root() -> Json<InfoResponse> {
    Json(InfoResponse {
        message: "DuckDuckGo Image Search API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        docs: "/docs".to_string(),
        endpoints: EndpointInfo {
            search: "/api/search".to_string(),
            search_post: "/api/search (POST)".to_string(),
            health: "/health".to_string(),
        },
    })
}

/// Health check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "meta"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
