//! Postsift Core
//!
//! Core types and error handling shared across Postsift components.
//!
//! This crate provides:
//! - The request/verdict types exchanged with remote classifier endpoints
//! - Endpoint identity used for fallback ordering and result attribution
//! - Error types and result handling, including the aggregated exhaustion
//!   report assembled when every endpoint has failed

pub mod error;
pub mod types;

pub use error::{AttemptFailure, Error, ExhaustionReport, Result};
pub use types::{Classification, ClassificationRequest, Endpoint};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{AttemptFailure, Error, ExhaustionReport, Result};
    pub use crate::types::{Classification, ClassificationRequest, Endpoint};
}
