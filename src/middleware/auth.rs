// API key authentication middleware

use axum::{
    extract::{Query, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::models::AppState;
use crate::routes::docs::is_public_path;
use crate::types::AppError;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const API_KEY_QUERY_PARAM: &str = "api_key";

#[derive(Debug, Deserialize)]
struct ApiKeyQuery {
    api_key: Option<String>,
}

/// Reject requests that do not carry the configured API key.
///
/// Applied to the whole router, unmatched paths included; only the info, health and
/// docs paths pass through. The `X-API-Key` header wins over the `api_key` query
/// parameter when both are present.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if is_public_path(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let supplied = supplied_api_key(req.headers(), req.uri());

    match supplied {
        Some(key) if verify_api_key(&key, &state.config.auth.api_key) => Ok(next.run(req).await),
        Some(_) => {
            warn!(path = %req.uri().path(), "Rejected request with invalid API key");
            Err(AppError::Unauthorized)
        }
        None => {
            warn!(path = %req.uri().path(), "Rejected request without API key");
            Err(AppError::Unauthorized)
        }
    }
}

fn supplied_api_key(headers: &HeaderMap, uri: &axum::http::Uri) -> Option<String> {
    if let Some(value) = headers.get(API_KEY_HEADER) {
        return value.to_str().ok().map(str::to_string);
    }

    Query::<ApiKeyQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.api_key)
}

/// Compare a caller-supplied key with the configured secret.
///
/// Both sides are hashed first so the comparison runs over equal-length digests,
/// and the digests are compared in constant time.
pub fn verify_api_key(supplied: &str, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }

    let a = Sha256::digest(supplied.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    constant_time_eq(&a, &b)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Uri};

    #[test]
    fn test_verify_api_key() {
        assert!(verify_api_key("secret-key", "secret-key"));
        assert!(!verify_api_key("secret-kez", "secret-key"));
        assert!(!verify_api_key("", "secret-key"));
        assert!(!verify_api_key("", ""));
    }

    #[test]
    fn test_header_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("from-header"));
        let uri: Uri = "/api/search?query=x&api_key=from-query".parse().unwrap();

        assert_eq!(supplied_api_key(&headers, &uri).as_deref(), Some("from-header"));
        assert_eq!(
            supplied_api_key(&HeaderMap::new(), &uri).as_deref(),
            Some("from-query")
        );

        let bare: Uri = "/api/search?query=x".parse().unwrap();
        assert_eq!(supplied_api_key(&HeaderMap::new(), &bare), None);
    }
}
