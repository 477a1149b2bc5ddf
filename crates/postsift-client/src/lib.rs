//! Postsift Client
//!
//! The multi-endpoint classification fallback protocol.
//!
//! This crate provides:
//! - A bounded single-attempt HTTP transport: one POST per call under a
//!   hard deadline, with a four-way failure taxonomy (timeout, http,
//!   network, decode)
//! - A strictly sequential [`ClassifierClient`] that walks its configured
//!   endpoint list in priority order, stops at the first well-formed label,
//!   and aggregates every absorbed failure into an exhaustion report
//! - The [`Classify`] trait seam that caller surfaces program against

pub mod client;
pub mod transport;

pub use client::{Classify, ClassifierClient, ClientConfig};
pub use transport::{EndpointReply, Transport, TransportError, DEFAULT_ATTEMPT_TIMEOUT};
