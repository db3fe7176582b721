//! API Routes
//!
//! - `/` - Service info (no auth)
//! - `/health` - Health check (no auth)
//! - `/docs`, `/openapi.json` - Swagger UI and OpenAPI schema (no auth)
//! - `/api/search` - Image search, GET with query parameters or POST with a JSON body
//!
//! Every other path, unmatched ones included, requires the `X-API-Key` header or the
//! `api_key` query parameter.

pub mod docs;
pub mod health;
pub mod search;

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::{cors_layer, require_api_key};
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.auth.allowed_origin);
    let auth = middleware::from_fn_with_state(state.clone(), require_api_key);

    Router::new()
        .merge(health::router())
        .merge(docs::router())
        .merge(search::router(state))
        .layer(auth)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
