// Error taxonomy and HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::search::SearchError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing or invalid API key")]
    Unauthorized,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Search provider error: {0}")]
    Provider(#[from] SearchError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Error kind: unauthorized, invalid_argument, provider_error, internal_error
    pub error: String,
    pub detail: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Provider(SearchError::RateLimited) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::Provider(_) => "provider_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to show callers. Upstream and internal details stay in the logs.
    fn public_detail(&self) -> String {
        match self {
            AppError::Unauthorized => "Missing or invalid API key".to_string(),
            AppError::InvalidArgument(msg) => msg.clone(),
            AppError::Provider(SearchError::RateLimited) => {
                "Image search is rate limited. Please try again later.".to_string()
            }
            AppError::Provider(_) => "Image search provider is unavailable.".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Provider(e) => warn!(error = %e, "Search provider failed"),
            AppError::Internal(e) => error!(error = %e, "Internal error"),
            _ => {}
        }

        let body = ErrorBody {
            error: self.kind().to_string(),
            detail: self.public_detail(),
        };
        (self.status(), Json(body)).into_response()
    }
}
