//! Postsift Extract
//!
//! Post URL recognition and mirror-fallback text extraction.
//!
//! This crate provides:
//! - [`PostUrlParser`]: recognizes `twitter.com` / `x.com` status URLs and
//!   normalizes share links to a canonical form
//! - [`MirrorExtractor`]: fetches a post's public page through an ordered
//!   list of mirror instances, first success wins, with a hard per-mirror
//!   deadline
//! - [`PageParser`]: pulls text, author, and timestamp out of a mirror page
//! - [`FailureQueue`]: append-only JSONL queue of posts that failed
//!   terminally, drained by the retry surface

pub mod extractor;
pub mod parser;
pub mod post_url;
pub mod queue;

pub use extractor::{ExtractConfig, MirrorExtractor, DEFAULT_MIRROR_TIMEOUT};
pub use parser::{ExtractedPost, PageParser};
pub use post_url::{PostUrl, PostUrlParser};
pub use queue::{FailedItem, FailureQueue};
