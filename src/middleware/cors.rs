// CORS configuration from the allowed-origin setting

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use super::auth::API_KEY_HEADER;

/// Build the CORS layer. `*` (or an unparsable origin) allows any origin.
pub fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(API_KEY_HEADER),
        ]);

    let origin = allowed_origin.trim();
    if origin == "*" || origin.is_empty() {
        return base.allow_origin(Any);
    }

    match HeaderValue::from_str(origin) {
        Ok(value) => base.allow_origin(AllowOrigin::exact(value)),
        Err(e) => {
            warn!(origin = %origin, error = %e, "Invalid ALLOWED_ORIGIN, allowing any origin");
            base.allow_origin(Any)
        }
    }
}
