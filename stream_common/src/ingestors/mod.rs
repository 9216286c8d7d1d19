//! # Event Sources Module
//!
//! This module holds the timer-driven producers that feed the relay queue.
//!
//! ## Contained Modules:
//! - **`phony`**: synthetic bursts of "John Doe" tweets, used when no feed
//!   credentials are configured.
//! - **`feed_polling`**: polls the upstream feed with a `since_id` cursor.
//!
//! `EventSource` is the closed set of variants the streamer chooses from at
//! startup. The choice is made once and never revisited.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// The cursor-driven feed poller.
pub mod feed_polling;
/// The synthetic event generator.
pub mod phony;

pub use feed_polling::FeedPollingSource;
pub use phony::PhonySource;

use crate::configs::StreamerConfig;
use crate::core::relay::RelaySender;
use crate::error::PipelineError;

/// Logged when the streamer falls back to phony events.
pub const FALLBACK_WARNING: &str = "Could not fetch API secrets, will continue with phony tweets.";

/// The streamer's event source.
pub enum EventSource {
    /// Synthetic events.
    Phony(PhonySource),
    /// Events polled from the upstream feed.
    Polling(FeedPollingSource),
}

impl EventSource {
    /// Picks the source for `config`.
    ///
    /// Complete credentials select the feed poller. Anything less falls back
    /// to phony events with a warning; this is the only configuration problem
    /// that is not fatal.
    pub fn from_config(config: &StreamerConfig) -> Result<Self, PipelineError> {
        match config.credentials.complete() {
            Ok(credentials) => Self::polling(credentials, config),
            Err(e) => {
                log::warn!("{}", FALLBACK_WARNING);
                log::info!("{}", e);
                Ok(Self::phony(config))
            }
        }
    }

    fn phony(config: &StreamerConfig) -> Self {
        EventSource::Phony(PhonySource::new(config.phony_interval))
    }

    #[cfg(feature = "feed")]
    fn polling(
        credentials: crate::configs::Credentials,
        config: &StreamerConfig,
    ) -> Result<Self, PipelineError> {
        let feed = crate::retrieve::HomeTimeline::new(credentials)?;
        log::info!("Polling home timeline at [{}]", feed.endpoint());
        Ok(EventSource::Polling(FeedPollingSource::new(
            std::sync::Arc::new(feed),
            config.tweet_count,
            config.poll_interval,
        )))
    }

    #[cfg(not(feature = "feed"))]
    fn polling(
        _credentials: crate::configs::Credentials,
        config: &StreamerConfig,
    ) -> Result<Self, PipelineError> {
        log::warn!("Built without feed support, will continue with phony tweets.");
        Ok(Self::phony(config))
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EventSource::Phony(_) => "phony",
            EventSource::Polling(_) => "feed polling",
        }
    }

    /// Runs the source until it fails or the relay queue closes.
    pub async fn run(self, queue: RelaySender) -> Result<(), PipelineError> {
        match self {
            EventSource::Phony(source) => source.run(queue).await,
            EventSource::Polling(source) => source.run(queue).await,
        }
    }
}
