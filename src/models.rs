use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::config::Config;
use crate::search::{DuckDuckGoClient, HttpProber, ImageProber, ImageProvider};
use crate::types::{AppError, AppResult};

pub const DEFAULT_MAX_RESULTS: u32 = 10;
pub const DEFAULT_REGION: &str = "us-en";
pub const DEFAULT_SAFESEARCH: &str = "off";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: Arc<dyn ImageProvider>,
    pub prober: Arc<dyn ImageProber>,
}

impl AppState {
    /// Wire the DuckDuckGo provider and the HTTP prober from configuration.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let provider = DuckDuckGoClient::from_config(&config.search)?;
        let prober = HttpProber::new(config.search.probe_timeout())?;

        Ok(Self {
            config: Arc::new(config),
            provider: Arc::new(provider),
            prober: Arc::new(prober),
        })
    }
}

// API Request/Response types

/// Raw search parameters as they arrive in a query string or JSON body.
#[derive(Debug, Default, Deserialize, Validate, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Search keywords
    #[serde(default)]
    pub query: String,
    /// Maximum number of results (1-100, default 10)
    #[validate(range(min = 1, max = 100, message = "max_results must be between 1 and 100"))]
    pub max_results: Option<i64>,
    /// Region code (wt-wt, us-en, uk-en, es-es, fr-fr)
    pub region: Option<String>,
    /// Safe search level (off, moderate, on)
    pub safesearch: Option<String>,
    /// Drop results whose image URL is unreachable (slower)
    #[serde(default, deserialize_with = "lenient_bool")]
    pub validate_images: Option<bool>,
    /// Time limit filter (d, w, m, y)
    pub timelimit: Option<String>,
    /// Result page (1-10, default 1)
    #[validate(range(min = 1, max = 10, message = "page must be between 1 and 10"))]
    pub page: Option<i64>,
    /// Size filter (Small, Medium, Large, Wallpaper)
    pub size: Option<String>,
    /// Color filter
    pub color: Option<String>,
    /// Type filter (photo, clipart, gif, transparent, line)
    pub type_image: Option<String>,
    /// Layout filter (Square, Tall, Wide)
    pub layout: Option<String>,
    /// License filter
    pub license_image: Option<String>,
}

/// Accept `true/false`, `1/0`, `yes/no` and `on/off` for boolean flags.
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    let value = match Option::<Flag>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(1)) => true,
        Some(Flag::Int(0)) => false,
        Some(Flag::Int(n)) => {
            return Err(serde::de::Error::custom(format!("invalid boolean value: {n}")))
        }
        Some(Flag::Text(text)) => match text.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => {
                return Err(serde::de::Error::custom(format!(
                    "invalid boolean value: {text:?}"
                )))
            }
        },
    };
    Ok(Some(value))
}

/// Optional provider-side filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageFilters {
    pub timelimit: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub type_image: Option<String>,
    pub layout: Option<String>,
    pub license_image: Option<String>,
}

/// A validated, normalized search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: u32,
    pub region: String,
    pub safesearch: String,
    pub validate_images: bool,
    pub page: u32,
    pub filters: ImageFilters,
}

impl TryFrom<SearchParams> for SearchRequest {
    type Error = AppError;

    fn try_from(params: SearchParams) -> AppResult<Self> {
        if params.query.trim().is_empty() {
            return Err(AppError::InvalidArgument("query must not be empty".to_string()));
        }
        params
            .validate()
            .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

        // Bounds were checked above, so the narrowing casts cannot truncate.
        Ok(Self {
            query: params.query.trim().to_string(),
            max_results: params
                .max_results
                .map(|n| n as u32)
                .unwrap_or(DEFAULT_MAX_RESULTS),
            region: non_empty(params.region).unwrap_or_else(|| DEFAULT_REGION.to_string()),
            safesearch: non_empty(params.safesearch)
                .unwrap_or_else(|| DEFAULT_SAFESEARCH.to_string()),
            validate_images: params.validate_images.unwrap_or(false),
            page: params.page.map(|p| p as u32).unwrap_or(1),
            filters: ImageFilters {
                timelimit: non_empty(params.timelimit),
                size: non_empty(params.size),
                color: non_empty(params.color),
                type_image: non_empty(params.type_image),
                layout: non_empty(params.layout),
                license_image: non_empty(params.license_image),
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Website {
    pub url: String,
    pub title: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Dimensions {
    pub width: u64,
    pub height: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImageResult {
    pub url: String,
    pub alt: String,
    pub thumbnail: String,
    pub title: String,
    pub source: String,
    pub website: Website,
    pub dimensions: Dimensions,
    /// 1-based provider rank, kept even when earlier entries are filtered out.
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub images: Vec<ImageResult>,
    pub count: usize,
    pub query: String,
    pub max_results: u32,
}

impl SearchResponse {
    pub fn new(images: Vec<ImageResult>, request: &SearchRequest) -> Self {
        Self {
            count: images.len(),
            images,
            query: request.query.clone(),
            max_results: request.max_results,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InfoResponse {
    pub message: String,
    pub version: String,
    pub docs: String,
    pub endpoints: EndpointInfo,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EndpointInfo {
    pub search: String,
    pub search_post: String,
    pub health: String,
}
