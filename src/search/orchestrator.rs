//! Search Orchestrator
//!
//! Runs one search request end to end:
//!
//! 1. Call the provider with the normalized request
//! 2. Map raw results into [`ImageResult`], numbering positions by provider rank
//! 3. When `validate_images` is set, probe every image URL and drop unreachable ones
//!
//! Positions are assigned before filtering, so a filtered response can have gaps
//! (e.g. 1, 3, 5) but always keeps the provider's ordering.

use futures::stream::{self, StreamExt};
use reqwest::Url;
use tracing::{debug, info};

use super::{ImageProber, ImageProvider, RawImage, SearchError};
use crate::models::{Dimensions, ImageResult, SearchRequest, SearchResponse, Website};

const UNKNOWN_WEBSITE: &str = "Unknown";

/// Execute `request` against `provider`, probing URLs with `prober` when asked to.
pub async fn run_search(
    provider: &dyn ImageProvider,
    prober: &dyn ImageProber,
    request: &SearchRequest,
    probe_concurrency: usize,
) -> Result<SearchResponse, SearchError> {
    let raw = provider.search(request).await?;
    debug!(received = raw.len(), "Provider returned results");

    let source = provider.source_label();
    let mut images: Vec<ImageResult> = raw
        .iter()
        .take(request.max_results as usize)
        .zip(1u32..)
        .map(|(raw, position)| map_image(raw, position, source))
        .collect();

    if request.validate_images {
        let before = images.len();
        images = retain_reachable(prober, images, probe_concurrency).await;
        info!(
            kept = images.len(),
            dropped = before - images.len(),
            "Image URL validation finished"
        );
    }

    Ok(SearchResponse::new(images, request))
}

/// Map one provider record into the public shape. Absent fields become empty values.
fn map_image(raw: &RawImage, position: u32, source: &str) -> ImageResult {
    let title = raw.text("title");
    let page_url = raw.text("url");

    ImageResult {
        url: raw.text("image"),
        alt: title.clone(),
        thumbnail: raw.text("thumbnail"),
        title: title.clone(),
        source: source.to_string(),
        website: Website {
            name: website_name(&page_url),
            url: page_url,
            title,
        },
        dimensions: Dimensions {
            width: raw.dimension("width"),
            height: raw.dimension("height"),
        },
        position,
    }
}

/// Host of the page URL; without a host, the first non-empty path segment.
fn website_name(page_url: &str) -> String {
    let name = match Url::parse(page_url) {
        Ok(url) => url
            .host_str()
            .filter(|host| !host.is_empty())
            .map(str::to_string)
            .or_else(|| first_segment(url.path())),
        Err(_) => first_segment(page_url),
    };

    name.filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNKNOWN_WEBSITE.to_string())
}

fn first_segment(path: &str) -> Option<String> {
    path.split('/')
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// The URL a result is validated by: the image itself, else its thumbnail.
fn probe_target(image: &ImageResult) -> &str {
    if image.url.is_empty() {
        &image.thumbnail
    } else {
        &image.url
    }
}

async fn retain_reachable(
    prober: &dyn ImageProber,
    images: Vec<ImageResult>,
    concurrency: usize,
) -> Vec<ImageResult> {
    stream::iter(images)
        .map(|image| async move {
            let target = probe_target(&image);
            let reachable = !target.is_empty() && prober.is_reachable(target).await;
            if !reachable {
                debug!(position = image.position, url = %target, "Dropping unreachable image");
            }
            (image, reachable)
        })
        .buffered(concurrency.max(1))
        .filter_map(|(image, reachable)| async move { reachable.then_some(image) })
        .collect()
        .await
}
