//! DuckDuckGo Image Search Client
//!
//! DuckDuckGo has no official image API. The web frontend works in two steps,
//! and this client does the same:
//!
//! 1. `GET /?q=<query>` returns an HTML page embedding a per-query `vqd` token
//! 2. `GET /i.js?o=json&q=<query>&vqd=<token>&...` returns a page of results
//!    plus a `next` cursor carrying the offset (`s=`) of the following page
//!
//! Pages are walked until enough unique images are collected or the cursor runs out.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{ImageProvider, RawImage, SearchError};
use crate::config::SearchConfig;
use crate::models::SearchRequest;

pub const SOURCE_LABEL: &str = "DuckDuckGo Search Images";

pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0 Safari/537.36";

/// Upper bound on result pages fetched for one request.
const MAX_PAGES: u32 = 20;

#[derive(Debug, Deserialize)]
struct ImagePage {
    #[serde(default)]
    results: Vec<Value>,
    next: Option<String>,
}

/// DuckDuckGo image search provider
pub struct DuckDuckGoClient {
    http: Client,
    base_url: String,
}

impl DuckDuckGoClient {
    /// Create a client against `base_url` with every call bounded by `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Configure client from config
    pub fn from_config(config: &SearchConfig) -> anyhow::Result<Self> {
        Ok(Self::new(config.base_url.clone(), config.timeout())?)
    }

    async fn fetch_vqd(&self, query: &str) -> Result<String, SearchError> {
        let response = self
            .http
            .get(format!("{}/", self.base_url))
            .query(&[("q", query)])
            .send()
            .await?;
        let body = check_status(response)?.text().await?;

        match extract_vqd(&body) {
            Some(vqd) => Ok(vqd),
            // A throttled client gets a 200 HTML challenge page instead of the token
            None if body.to_lowercase().contains("ratelimit") => Err(SearchError::RateLimited),
            None => Err(SearchError::MissingToken),
        }
    }

    async fn fetch_page(
        &self,
        request: &SearchRequest,
        vqd: &str,
        offset: &str,
    ) -> Result<ImagePage, SearchError> {
        let params = [
            ("o", "json".to_string()),
            ("q", request.query.clone()),
            ("l", request.region.clone()),
            ("vqd", vqd.to_string()),
            ("p", safesearch_param(&request.safesearch)),
            ("f", filter_param(request)),
            ("s", offset.to_string()),
        ];

        let response = self
            .http
            .get(format!("{}/i.js", self.base_url))
            .header(header::REFERER, format!("{}/", self.base_url))
            .query(&params)
            .send()
            .await?;
        let body = check_status(response)?.text().await?;

        serde_json::from_str(&body).map_err(|e| {
            if body.to_lowercase().contains("ratelimit") {
                SearchError::RateLimited
            } else {
                SearchError::Parse(e.to_string())
            }
        })
    }
}

#[async_trait]
impl ImageProvider for DuckDuckGoClient {
    fn source_label(&self) -> &str {
        SOURCE_LABEL
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<RawImage>, SearchError> {
        info!(
            query = %request.query,
            region = %request.region,
            safesearch = %request.safesearch,
            page = request.page,
            "Searching DuckDuckGo images"
        );

        let vqd = self.fetch_vqd(&request.query).await?;
        debug!("Obtained vqd token");

        let limit = request.max_results as usize;
        let mut images = Vec::with_capacity(limit);
        let mut seen = HashSet::new();
        let mut offset = "0".to_string();

        for page_number in 1..=MAX_PAGES {
            let page = self.fetch_page(request, &vqd, &offset).await?;
            debug!(page = page_number, results = page.results.len(), "Fetched result page");

            if page_number >= request.page {
                for row in page.results {
                    let raw = RawImage::new(row);
                    let image_url = raw.text("image");
                    if image_url.is_empty() || !seen.insert(image_url) {
                        continue;
                    }
                    images.push(raw);
                    if images.len() >= limit {
                        info!(count = images.len(), "DuckDuckGo image search completed");
                        return Ok(images);
                    }
                }
            }

            match page.next.as_deref().and_then(next_offset) {
                Some(next) => offset = next,
                None => break,
            }
        }

        if images.is_empty() {
            warn!(query = %request.query, "DuckDuckGo returned no images");
        }
        info!(count = images.len(), "DuckDuckGo image search completed");
        Ok(images)
    }
}

fn check_status(response: Response) -> Result<Response, SearchError> {
    match response.status() {
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => Err(SearchError::RateLimited),
        status if !status.is_success() => {
            Err(SearchError::Request(format!("upstream returned {status}")))
        }
        _ => Ok(response),
    }
}

/// Pull the `vqd` token out of the search page HTML.
fn extract_vqd(html: &str) -> Option<String> {
    let patterns = [("vqd=\"", '"'), ("vqd='", '\''), ("vqd=", '&')];

    for (prefix, terminator) in patterns {
        if let Some(pos) = html.find(prefix) {
            let rest = &html[pos + prefix.len()..];
            if let Some(end) = rest.find(terminator) {
                let token = &rest[..end];
                if !token.is_empty() && !token.contains(char::is_whitespace) {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Offset of the following page, taken from the `s=` parameter of the `next` cursor.
fn next_offset(next: &str) -> Option<String> {
    let query = next.split_once('?').map_or(next, |(_, q)| q);
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "s")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn safesearch_param(level: &str) -> String {
    match level.to_lowercase().as_str() {
        "on" | "moderate" => "1".to_string(),
        "off" => "-1".to_string(),
        _ => level.to_string(),
    }
}

fn filter_param(request: &SearchRequest) -> String {
    let f = &request.filters;
    let slot = |name: &str, value: &Option<String>| {
        value
            .as_deref()
            .map(|v| format!("{name}:{v}"))
            .unwrap_or_default()
    };

    [
        slot("time", &f.timelimit),
        slot("size", &f.size),
        slot("color", &f.color),
        slot("type", &f.type_image),
        slot("layout", &f.layout),
        slot("license", &f.license_image),
    ]
    .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageFilters;
    use mockito::Matcher;
    use serde_json::json;

    fn request(query: &str, max_results: u32) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            max_results,
            region: "us-en".to_string(),
            safesearch: "off".to_string(),
            validate_images: false,
            page: 1,
            filters: ImageFilters::default(),
        }
    }

    fn row(n: u32) -> Value {
        json!({
            "title": format!("Butterfly {n}"),
            "image": format!("https://img.example.com/{n}.jpg"),
            "thumbnail": format!("https://tse.example.com/{n}.jpg"),
            "url": format!("https://site{n}.example.com/page"),
            "width": 800,
            "height": 600,
            "source": "Bing",
        })
    }

    fn client(server: &mockito::ServerGuard) -> DuckDuckGoClient {
        DuckDuckGoClient::new(server.url(), Duration::from_secs(5)).unwrap()
    }

    async fn mock_token(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("GET", "/")
            .match_query(Matcher::UrlEncoded("q".into(), "butterfly".into()))
            .with_body(r#"<html><script>nrj('/d.js?q=butterfly&vqd="4-1234"');</script></html>"#)
            .create_async()
            .await
    }

    #[test]
    fn test_extract_vqd() {
        assert_eq!(extract_vqd(r#"foo vqd="4-abc" bar"#), Some("4-abc".to_string()));
        assert_eq!(extract_vqd("foo vqd='4-def' bar"), Some("4-def".to_string()));
        assert_eq!(extract_vqd("/d.js?vqd=4-ghi&kl=wt-wt"), Some("4-ghi".to_string()));
        assert_eq!(extract_vqd("<html>nothing here</html>"), None);
    }

    #[test]
    fn test_next_offset() {
        assert_eq!(
            next_offset("i.js?q=cat&o=json&p=-1&s=100&u=bing&f=,,,,,&l=us-en"),
            Some("100".to_string())
        );
        assert_eq!(next_offset("i.js?q=cat&o=json"), None);
        assert_eq!(next_offset("i.js?s="), None);
    }

    #[test]
    fn test_params() {
        assert_eq!(safesearch_param("off"), "-1");
        assert_eq!(safesearch_param("Moderate"), "1");
        assert_eq!(safesearch_param("on"), "1");
        assert_eq!(safesearch_param("strict"), "strict");

        let mut req = request("x", 5);
        assert_eq!(filter_param(&req), ",,,,,");

        req.filters.color = Some("Monochrome".to_string());
        req.filters.timelimit = Some("w".to_string());
        req.filters.layout = Some("Wide".to_string());
        assert_eq!(filter_param(&req), "time:w,,color:Monochrome,,layout:Wide,");
    }

    #[tokio::test]
    async fn test_search_single_page() {
        let mut server = mockito::Server::new_async().await;
        let token = mock_token(&mut server).await;
        let images = server
            .mock("GET", "/i.js")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("o".into(), "json".into()),
                Matcher::UrlEncoded("q".into(), "butterfly".into()),
                Matcher::UrlEncoded("l".into(), "us-en".into()),
                Matcher::UrlEncoded("vqd".into(), "4-1234".into()),
                Matcher::UrlEncoded("p".into(), "-1".into()),
                Matcher::UrlEncoded("s".into(), "0".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(json!({ "results": (1..=5).map(row).collect::<Vec<_>>() }).to_string())
            .create_async()
            .await;

        let results = client(&server).search(&request("butterfly", 3)).await.unwrap();

        token.assert_async().await;
        images.assert_async().await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].text("title"), "Butterfly 1");
        assert_eq!(results[2].text("image"), "https://img.example.com/3.jpg");
    }

    #[tokio::test]
    async fn test_search_follows_cursor_and_dedupes() {
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _first = server
            .mock("GET", "/i.js")
            .match_query(Matcher::UrlEncoded("s".into(), "0".into()))
            .with_body(
                json!({
                    "results": [row(1), row(2), row(2)],
                    "next": "i.js?q=butterfly&o=json&s=3&vqd=4-1234",
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _second = server
            .mock("GET", "/i.js")
            .match_query(Matcher::UrlEncoded("s".into(), "3".into()))
            .with_body(json!({ "results": [row(2), row(3), json!({ "title": "no image" })] }).to_string())
            .create_async()
            .await;

        let results = client(&server).search(&request("butterfly", 10)).await.unwrap();

        let titles: Vec<_> = results.iter().map(|r| r.text("title")).collect();
        assert_eq!(titles, vec!["Butterfly 1", "Butterfly 2", "Butterfly 3"]);
    }

    #[tokio::test]
    async fn test_page_selects_cursor_linked_page() {
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _first = server
            .mock("GET", "/i.js")
            .match_query(Matcher::UrlEncoded("s".into(), "0".into()))
            .with_body(
                json!({
                    "results": [row(1), row(2)],
                    "next": "i.js?q=butterfly&o=json&s=2&vqd=4-1234",
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _second = server
            .mock("GET", "/i.js")
            .match_query(Matcher::UrlEncoded("s".into(), "2".into()))
            .with_body(json!({ "results": [row(3), row(4)] }).to_string())
            .create_async()
            .await;

        let mut req = request("butterfly", 10);
        req.page = 2;
        let results = client(&server).search(&req).await.unwrap();
        let titles: Vec<_> = results.iter().map(|r| r.text("title")).collect();
        assert_eq!(titles, vec!["Butterfly 3", "Butterfly 4"]);

        req.page = 3;
        let results = client(&server).search(&req).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_token_page_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><body>Ratelimit exceeded, please retry later</body></html>")
            .create_async()
            .await;

        let err = client(&server).search(&request("butterfly", 5)).await.unwrap_err();
        assert!(matches!(err, SearchError::RateLimited));
        assert_eq!(
            crate::types::AppError::from(err).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _images = server
            .mock("GET", "/i.js")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let err = client(&server).search(&request("butterfly", 5)).await.unwrap_err();
        assert!(matches!(err, SearchError::RateLimited));
    }

    #[tokio::test]
    async fn test_missing_token_and_bad_payload() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_body("<html>no token</html>")
            .create_async()
            .await;

        let err = client(&server).search(&request("butterfly", 5)).await.unwrap_err();
        assert!(matches!(err, SearchError::MissingToken));

        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _images = server
            .mock("GET", "/i.js")
            .match_query(Matcher::Any)
            .with_body("not json")
            .create_async()
            .await;

        let err = client(&server).search(&request("butterfly", 5)).await.unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)));
    }
}
