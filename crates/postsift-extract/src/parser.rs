//! HTML field extraction for mirror pages

use postsift_core::{ClassificationRequest, Error, Result};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

/// Content extracted from a public mirror page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedPost {
    /// Post text content
    pub text: String,

    /// Display name of the posting account, when the page carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Post timestamp as printed by the mirror, not normalized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_time: Option<String>,

    /// Canonical URL of the post
    pub url: String,
}

impl ExtractedPost {
    /// Convert into a classification request tagged with the caller surface
    pub fn into_request(self, source: &str) -> ClassificationRequest {
        let mut request = ClassificationRequest::from_text(self.text).with_url(self.url);
        if let Some(author) = self.author {
            request = request.with_author(author);
        }
        if let Some(post_time) = self.post_time {
            request = request.with_post_time(post_time);
        }
        request.with_source(source)
    }
}

/// Pulls post fields out of a mirror's status page.
///
/// The text comes from the tweet content container, with the
/// `og:description` meta tag as fallback; author and timestamp are optional
/// and their absence never fails the parse.
#[derive(Debug, Clone)]
pub struct PageParser {
    content: Selector,
    fullname: Selector,
    date: Selector,
    og_description: Selector,
}

impl PageParser {
    /// Create a new page parser
    pub fn new() -> Result<Self> {
        Ok(Self {
            content: compile_selector(".tweet-content")?,
            fullname: compile_selector("a.fullname")?,
            date: compile_selector("span.tweet-date a")?,
            og_description: compile_selector(r#"meta[property="og:description"]"#)?,
        })
    }

    /// Extract post fields from `html`, failing when no text can be found
    pub fn parse(&self, html: &str, canonical_url: &str) -> Result<ExtractedPost> {
        let document = Html::parse_document(html);

        let text = self
            .element_text(&document, &self.content)
            .or_else(|| self.meta_content(&document))
            .ok_or_else(|| Error::extract("post text not found in page"))?;

        Ok(ExtractedPost {
            text,
            author: self.element_text(&document, &self.fullname),
            post_time: document
                .select(&self.date)
                .next()
                .and_then(|el| el.value().attr("title"))
                .map(str::to_owned),
            url: canonical_url.to_string(),
        })
    }

    fn element_text(&self, document: &Html, selector: &Selector) -> Option<String> {
        let text = document
            .select(selector)
            .next()?
            .text()
            .collect::<String>()
            .trim()
            .to_string();
        (!text.is_empty()).then_some(text)
    }

    fn meta_content(&self, document: &Html) -> Option<String> {
        let content = document
            .select(&self.og_description)
            .next()?
            .value()
            .attr("content")?
            .trim()
            .to_string();
        (!content.is_empty()).then_some(content)
    }
}

impl Default for PageParser {
    fn default() -> Self {
        Self::new().expect("Failed to create page parser")
    }
}

fn compile_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| Error::extract(format!("Failed to compile selector {}: {}", selector, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIRROR_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta property="og:description" content="fallback description"/></head>
<body>
  <div class="main-tweet">
    <a class="fullname" href="/someone">Some One</a>
    <div class="tweet-content media-body">An example post with
        several words in it.</div>
    <span class="tweet-date"><a title="Jan 2, 2024 · 3:04 PM UTC" href="/someone/status/42">Jan 2</a></span>
  </div>
</body>
</html>"#;

    #[test]
    fn parses_all_fields_from_a_mirror_page() {
        let parser = PageParser::new().unwrap();
        let post = parser
            .parse(MIRROR_PAGE, "https://x.com/someone/status/42")
            .unwrap();

        assert!(post.text.starts_with("An example post"));
        assert_eq!(post.author.as_deref(), Some("Some One"));
        assert_eq!(post.post_time.as_deref(), Some("Jan 2, 2024 · 3:04 PM UTC"));
        assert_eq!(post.url, "https://x.com/someone/status/42");
    }

    #[test]
    fn falls_back_to_og_description() {
        let html = r#"<html><head>
            <meta property="og:description" content="only the meta text"/>
            </head><body><p>chrome</p></body></html>"#;

        let parser = PageParser::new().unwrap();
        let post = parser.parse(html, "https://x.com/a/status/1").unwrap();
        assert_eq!(post.text, "only the meta text");
        assert!(post.author.is_none());
    }

    #[test]
    fn fails_when_no_text_is_present() {
        let parser = PageParser::new().unwrap();
        let err = parser
            .parse("<html><body><p>unrelated</p></body></html>", "https://x.com/a/status/1")
            .unwrap_err();
        assert!(err.to_string().contains("post text not found"));
    }

    #[test]
    fn extracted_post_converts_into_a_tagged_request() {
        let post = ExtractedPost {
            text: "hello".to_string(),
            author: Some("Some One".to_string()),
            post_time: None,
            url: "https://x.com/a/status/1".to_string(),
        };

        let request = post.into_request("retry");
        assert_eq!(request.text.as_deref(), Some("hello"));
        assert_eq!(request.author.as_deref(), Some("Some One"));
        assert_eq!(request.source.as_deref(), Some("retry"));
        assert!(request.post_time.is_none());
        assert!(request.validate().is_ok());
    }
}
