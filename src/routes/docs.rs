//! OpenAPI schema at `/openapi.json` and Swagger UI at `/docs`

use axum::Router;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use super::{health, search};
use crate::middleware::API_KEY_HEADER;
use crate::models::{
    Dimensions, EndpointInfo, HealthResponse, ImageResult, InfoResponse, SearchParams,
    SearchResponse, Website,
};
use crate::types::ErrorBody;

pub const DOCS_PATH: &str = "/docs";
pub const OPENAPI_PATH: &str = "/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "DuckDuckGo Image Search API",
        description = "Search images using DuckDuckGo with filtering options"
    ),
    paths(
        health::root,
        health::health_check,
        search::search_get,
        search::search_post,
    ),
    components(schemas(
        SearchParams,
        SearchResponse,
        ImageResult,
        Website,
        Dimensions,
        HealthResponse,
        InfoResponse,
        EndpointInfo,
        ErrorBody,
    )),
    modifiers(&ApiKeyScheme),
    tags(
        (name = "search", description = "Image search"),
        (name = "meta", description = "Service info and health")
    )
)]
pub struct ApiDoc;

struct ApiKeyScheme;

impl Modify for ApiKeyScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
        );
    }
}

pub fn router() -> Router {
    Router::new().merge(SwaggerUi::new(DOCS_PATH).url(OPENAPI_PATH, ApiDoc::openapi()))
}

/// Paths served without an API key.
pub fn is_public_path(path: &str) -> bool {
    matches!(path, "/" | "/health" | OPENAPI_PATH)
        || path == DOCS_PATH
        || path.starts_with("/docs/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lists_search_paths() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();

        assert!(doc["paths"]["/api/search"].get("get").is_some());
        assert!(doc["paths"]["/api/search"].get("post").is_some());
        assert!(doc["paths"]["/health"].get("get").is_some());
        assert!(doc["components"]["schemas"].get("ImageResult").is_some());
        assert_eq!(
            doc["components"]["securitySchemes"]["api_key"]["name"],
            API_KEY_HEADER
        );
    }

    #[test]
    fn test_public_paths() {
        for path in ["/", "/health", "/openapi.json", "/docs", "/docs/", "/docs/index.css"] {
            assert!(is_public_path(path), "{path}");
        }
        for path in ["/api/search", "/api/other", "/healthz", "/docsx", "/anything"] {
            assert!(!is_public_path(path), "{path}");
        }
    }
}
