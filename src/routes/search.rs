use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use tracing::info;

use crate::models::{AppState, SearchParams, SearchRequest, SearchResponse};
use crate::search::run_search;
use crate::types::{AppError, AppResult, ErrorBody};

/// `/api/search` for both verbs. The API key gate is applied router-wide in `routes::create_router`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/search", get(search_get).post(search_post))
        .with_state(state)
}

/// Search images with query parameters
#[utoipa::path(
    get,
    path = "/api/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Search results", body = SearchResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorBody),
        (status = 422, description = "Invalid search parameters", body = ErrorBody),
        (status = 502, description = "Search provider failed", body = ErrorBody),
        (status = 503, description = "Search provider rate limited", body = ErrorBody),
    ),
    security(("api_key" = [])),
    tag = "search"
)]
pub async fn search_get(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> AppResult<Json<SearchResponse>> {
    let Query(params) = params.map_err(|e| AppError::InvalidArgument(e.body_text()))?;
    search(&state, params).await
}

/// Search images with a JSON body
#[utoipa::path(
    post,
    path = "/api/search",
    request_body = SearchParams,
    responses(
        (status = 200, description = "Search results", body = SearchResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorBody),
        (status = 422, description = "Invalid search parameters", body = ErrorBody),
        (status = 502, description = "Search provider failed", body = ErrorBody),
        (status = 503, description = "Search provider rate limited", body = ErrorBody),
    ),
    security(("api_key" = [])),
    tag = "search"
)]
pub async fn search_post(
    State(state): State<AppState>,
    params: Result<Json<SearchParams>, JsonRejection>,
) -> AppResult<Json<SearchResponse>> {
    let Json(params) = params.map_err(|e| AppError::InvalidArgument(e.body_text()))?;
    search(&state, params).await
}

async fn search(state: &AppState, params: SearchParams) -> AppResult<Json<SearchResponse>> {
    let request = SearchRequest::try_from(params)?;
    info!(
        query = %request.query,
        max_results = request.max_results,
        validate_images = request.validate_images,
        "Image search request"
    );

    let response = run_search(
        state.provider.as_ref(),
        state.prober.as_ref(),
        &request,
        state.config.search.probe_concurrency,
    )
    .await?;

    info!(count = response.count, "Image search response sent");
    Ok(Json(response))
}
