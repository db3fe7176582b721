// Image URL liveness checks

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::debug;

use super::duckduckgo::BROWSER_USER_AGENT;
use super::ImageProber;

/// Probes image URLs with a `HEAD` request.
///
/// A URL counts as reachable when it is `http(s)`, answers 200 after redirects,
/// and declares an `image/*` content type.
pub struct HttpProber {
    http: Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ImageProber for HttpProber {
    async fn is_reachable(&self, url: &str) -> bool {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return false;
        }

        let response = match self.http.head(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %url, error = %e, "Image probe failed");
                return false;
            }
        };

        if response.status() != StatusCode::OK {
            debug!(url = %url, status = %response.status(), "Image probe rejected");
            return false;
        }

        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim().to_lowercase().starts_with("image/"))
    }
}
