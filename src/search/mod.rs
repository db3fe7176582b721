//! Search Module
//!
//! Image search behind a provider trait:
//! - `duckduckgo` - DuckDuckGo image search client (the production provider)
//! - `probe` - reachability checks for returned image URLs
//! - `orchestrator` - the request pipeline: provider call, optional probing, response shaping
//!
//! Providers return loosely-typed [`RawImage`] records; the orchestrator maps them
//! field by field into the public [`crate::models::ImageResult`] shape.

pub mod duckduckgo;
pub mod orchestrator;
pub mod probe;

pub use duckduckgo::DuckDuckGoClient;
pub use orchestrator::run_search;
pub use probe::HttpProber;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::SearchRequest;

/// Errors that can occur while talking to a search provider
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Provider rate limit reached")]
    RateLimited,

    #[error("Search request failed: {0}")]
    Request(String),

    #[error("Failed to parse search results: {0}")]
    Parse(String),

    #[error("Search token not found in provider response")]
    MissingToken,
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.status().is_some_and(|s| s.as_u16() == 403 || s.as_u16() == 429) {
            SearchError::RateLimited
        } else if e.is_decode() {
            SearchError::Parse(e.to_string())
        } else {
            SearchError::Request(e.to_string())
        }
    }
}

/// One provider result before it is mapped to the public shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage(Value);

impl RawImage {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// String field, or an empty string when absent or not a string.
    pub fn text(&self, key: &str) -> String {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Non-negative integer field; numeric strings are accepted, anything else is 0.
    pub fn dimension(&self, key: &str) -> u64 {
        match self.0.get(key) {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Human-readable provider label, used as the `source` of every result.
    fn source_label(&self) -> &str;

    /// Return up to `request.max_results` raw results in provider rank order.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<RawImage>, SearchError>;
}

#[async_trait]
pub trait ImageProber: Send + Sync {
    /// Whether `url` currently serves an image.
    async fn is_reachable(&self, url: &str) -> bool;
}
