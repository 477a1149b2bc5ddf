//! Core types for Postsift

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single remote classifier endpoint.
///
/// Endpoints carry no health state. Priority is implicit in the position of
/// the endpoint inside the configured list, element 0 first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Base URL the classification request is POSTed to
    pub url: String,

    /// Optional display name used in logs and result attribution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Endpoint {
    /// Create an endpoint from a bare URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
        }
    }

    /// Create an endpoint with an explicit display name
    pub fn named(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: Some(name.into()),
        }
    }

    /// Name used in logs and verdict attribution: the explicit name when
    /// configured, otherwise the URL host, otherwise the raw URL.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
            .unwrap_or_else(|| self.url.clone())
    }
}

/// Content submitted for classification.
///
/// All fields are optional on the wire; a request is valid once at least one
/// of `text` / `url` carries non-whitespace content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationRequest {
    /// Post text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Canonical URL of the post
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Handle of the posting account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Post timestamp as scraped, not normalized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_time: Option<String>,

    /// Caller surface that produced this request (`api`, `cli`, `retry`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ClassificationRequest {
    /// Create a request from post text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Create a request from a post URL
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Attach the post URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attach the posting account's handle
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Attach the scraped post timestamp
    pub fn with_post_time(mut self, post_time: impl Into<String>) -> Self {
        self.post_time = Some(post_time.into());
        self
    }

    /// Tag the caller surface
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Reject requests that carry neither text nor url before any I/O happens
    pub fn validate(&self) -> Result<()> {
        if has_content(&self.text) || has_content(&self.url) {
            Ok(())
        } else {
            Err(Error::invalid_request(
                "at least one of text or url must be non-empty",
            ))
        }
    }
}

fn has_content(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// A successful classification verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    /// Label assigned by the classifier service
    pub label: String,

    /// Optional explanation returned alongside the label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Display name of the endpoint that produced the verdict
    pub endpoint: String,

    /// Time the winning attempt took (milliseconds)
    pub latency_ms: u64,
}
