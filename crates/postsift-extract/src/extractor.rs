//! Mirror-fallback post extraction

use std::time::Duration;

use postsift_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::parser::{ExtractedPost, PageParser};
use crate::post_url::{PostUrl, PostUrlParser};

/// Default hard deadline for one mirror fetch
pub const DEFAULT_MIRROR_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Browser-like agent string; several public mirrors reject the default one
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Configuration for a [`MirrorExtractor`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Mirror base URLs in priority order; element 0 is tried first
    #[serde(default = "default_mirrors")]
    pub mirrors: Vec<String>,

    /// Hard per-mirror deadline in milliseconds
    #[serde(default = "default_mirror_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_mirrors() -> Vec<String> {
    [
        "https://nitter.net",
        "https://nitter.privacydev.net",
        "https://nitter.poast.org",
        "https://nitter.1d4.us",
        "https://nitter.kavin.rocks",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_mirror_timeout_ms() -> u64 {
    10_000
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            mirrors: default_mirrors(),
            timeout_ms: default_mirror_timeout_ms(),
        }
    }
}

/// Fetches a post's public page through an ordered mirror list.
///
/// Mirrors are tried sequentially with a hard per-mirror deadline; the first
/// page that yields post text wins. Transport failures, non-2xx replies, and
/// parse misses all fall through to the next mirror.
#[derive(Debug, Clone)]
pub struct MirrorExtractor {
    mirrors: Vec<String>,
    http: reqwest::Client,
    pages: PageParser,
    post_urls: PostUrlParser,
}

impl MirrorExtractor {
    /// Build an extractor from configuration
    pub fn new(config: ExtractConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            mirrors: config.mirrors,
            http,
            pages: PageParser::new()?,
            post_urls: PostUrlParser::new()?,
        })
    }

    /// Parse and normalize a post URL without fetching anything
    pub fn parse_post_url(&self, url: &str) -> Result<PostUrl> {
        self.post_urls.parse(url)
    }

    /// True when `url` addresses a single post
    pub fn is_post_url(&self, url: &str) -> bool {
        self.post_urls.is_post_url(url)
    }

    /// Extract the post behind `post_url` via the first mirror that serves it
    pub async fn extract(&self, post_url: &str) -> Result<ExtractedPost> {
        let post = self.post_urls.parse(post_url)?;

        for mirror in &self.mirrors {
            let page_url = self.page_url(mirror, &post);
            debug!("Trying mirror {}", page_url);

            match self.fetch_and_parse(&page_url, &post).await {
                Ok(extracted) => {
                    info!("Extracted post {} via {}", post.canonical, mirror);
                    return Ok(extracted);
                }
                Err(e) => {
                    warn!("Mirror {} failed for {}: {}", mirror, post.canonical, e);
                    metrics::counter!("postsift_mirror_failures_total").increment(1);
                }
            }
        }

        metrics::counter!("postsift_extract_failures_total").increment(1);
        Err(Error::extract(format!(
            "all {} mirrors failed for {}",
            self.mirrors.len(),
            post.canonical
        )))
    }

    fn page_url(&self, mirror: &str, post: &PostUrl) -> String {
        format!(
            "{}/{}/status/{}",
            mirror.trim_end_matches('/'),
            post.username,
            post.status_id
        )
    }

    async fn fetch_and_parse(&self, page_url: &str, post: &PostUrl) -> Result<ExtractedPost> {
        let response = self
            .http
            .get(page_url)
            .send()
            .await
            .map_err(|e| Error::extract(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::extract(format!("http status {}", status.as_u16())));
        }

        let html = response
            .text()
            .await
            .map_err(|e| Error::extract(e.to_string()))?;
        self.pages.parse(&html, &post.canonical)
    }
}
