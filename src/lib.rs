// Image Search API - DuckDuckGo image search behind an API key

pub mod config;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod search;    // Provider client, URL probing, search pipeline
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
