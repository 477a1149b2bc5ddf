//! Post URL recognition and normalization

use postsift_core::{Error, Result};
use regex::Regex;

/// A recognized social post address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostUrl {
    /// Posting account's handle; `i` for share links that carry no handle
    pub username: String,

    /// Numeric status id
    pub status_id: String,

    /// Canonical `https://x.com/{username}/status/{id}` form
    pub canonical: String,
}

/// Recognizes `twitter.com` / `x.com` status URLs, including the
/// `/i/web/status/{id}` share form that carries no account handle.
#[derive(Debug, Clone)]
pub struct PostUrlParser {
    status: Regex,
    share: Regex,
}

impl PostUrlParser {
    /// Create a new post URL parser
    pub fn new() -> Result<Self> {
        Ok(Self {
            status: Regex::new(r"(?:twitter\.com|x\.com)/([A-Za-z0-9_]+)/status/(\d+)")
                .map_err(|e| Error::extract(format!("Failed to compile status pattern: {}", e)))?,
            share: Regex::new(r"(?:twitter\.com|x\.com)/i/web/status/(\d+)")
                .map_err(|e| Error::extract(format!("Failed to compile share pattern: {}", e)))?,
        })
    }

    /// Parse a post URL, or reject it when it does not address a status.
    ///
    /// Query strings and trailing path segments after the status id are
    /// tolerated; the canonical form drops them.
    pub fn parse(&self, url: &str) -> Result<PostUrl> {
        // Share form first, it is the more specific path shape.
        if let Some(caps) = self.share.captures(url) {
            let status_id = caps[1].to_string();
            return Ok(PostUrl {
                canonical: format!("https://x.com/i/status/{}", status_id),
                username: "i".to_string(),
                status_id,
            });
        }

        if let Some(caps) = self.status.captures(url) {
            let username = caps[1].to_string();
            let status_id = caps[2].to_string();
            return Ok(PostUrl {
                canonical: format!("https://x.com/{}/status/{}", username, status_id),
                username,
                status_id,
            });
        }

        Err(Error::invalid_request(format!("not a post url: {}", url)))
    }

    /// True when `url` addresses a single post
    pub fn is_post_url(&self, url: &str) -> bool {
        self.parse(url).is_ok()
    }
}

impl Default for PostUrlParser {
    fn default() -> Self {
        Self::new().expect("Failed to create post URL parser")
    }
}
