//! # Data Retrieval Module
//!
//! This module holds the upstream feed capability used by the polling event
//! source, and the HTTP client that implements it.
//!
//! ## Contained Modules:
//!
//! - **`timeline`**: `HomeTimeline`, a `reqwest` client for the v1.1 home
//!   timeline endpoint.
//! - **`oauth1`**: OAuth 1.0a (HMAC-SHA1) request signing for that client.
//!
//! The `EventFeed` trait is the seam: the polling source only knows how to ask
//! for "at most `count` events newer than `since_id`", so tests can swap in a
//! scripted feed.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use async_trait::async_trait;
use thiserror::Error;

use crate::core::event::Event;

/// OAuth 1.0a request signing.
#[cfg(feature = "feed")]
pub mod oauth1;
/// The home timeline HTTP client.
#[cfg(feature = "feed")]
pub mod timeline;

#[cfg(feature = "feed")]
pub use timeline::HomeTimeline;

/// Errors raised while polling the upstream feed. All of them are fatal to the
/// streamer.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[cfg(feature = "feed")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The feed answered with a non-success status.
    #[error("Feed returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The request could not be signed.
    #[error("Failed to sign request: {0}")]
    Signing(String),

    /// The feed endpoint is not a valid absolute URL.
    #[error("Invalid feed URL: {0}")]
    Url(String),

    /// The response body is not a list of statuses.
    #[error("Malformed feed response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// # Event Feed
///
/// An upstream that returns recent events, newest first.
#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Fetches at most `count` events with an id greater than `since_id`.
    ///
    /// A `since_id` of `0` means no lower bound.
    async fn fetch_events(&self, count: usize, since_id: i64) -> Result<Vec<Event>, FetchError>;
}
