//! # Feed Polling Source
//!
//! A self-scheduling ingestor for the upstream feed. Every `interval` it asks
//! the feed for at most `count` events newer than its cursor, moves the cursor
//! past the batch, and enqueues the batch in the order the feed returned it.
//!
//! ## Key Design Principles:
//! - **Dedup by watermark**: the `Cursor` is the only dedup mechanism. An empty
//!   poll changes nothing.
//! - **Fail fast**: any feed error ends the source with `PipelineError::Fetch`.
//!   There is no retry at this layer.
//! - **Page size**: the feed is asked for exactly `count` events. A full page
//!   means newer-than-cursor events beyond the page may never be seen; that is
//!   logged as a warning.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::core::cursor::Cursor;
use crate::core::relay::RelaySender;
use crate::error::PipelineError;
use crate::retrieve::EventFeed;

/// # Feed Polling Source
///
/// Owns its cursor exclusively; the cursor lives only for the life of the
/// source.
pub struct FeedPollingSource {
    feed: Arc<dyn EventFeed>,
    count: usize,
    interval: Duration,
    cursor: Cursor,
}

impl FeedPollingSource {
    /// Creates a source polling `feed` for `count` events every `interval`.
    pub fn new(feed: Arc<dyn EventFeed>, count: usize, interval: Duration) -> Self {
        Self {
            feed,
            count,
            interval,
            cursor: Cursor::new(),
        }
    }

    /// The current watermark.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Runs one fetch/advance/enqueue cycle. Returns the number of events
    /// enqueued.
    pub async fn poll_once(&mut self, queue: &RelaySender) -> Result<usize, PipelineError> {
        // --- Phase 1: Fetch newer events ---
        let batch = self
            .feed
            .fetch_events(self.count, self.cursor.since_id())
            .await?;

        if self.count > 0 && batch.len() >= self.count {
            log::warn!(
                "Poll returned a full page of {} events after id {}, older unseen events may be skipped",
                batch.len(),
                self.cursor.since_id()
            );
        }

        // --- Phase 2: Advance the watermark ---
        self.cursor.advance(&batch);

        // --- Phase 3: Enqueue in feed order ---
        let size = batch.len();
        for event in batch {
            queue.send(event).await?;
        }
        Ok(size)
    }

    /// Polls forever; the first poll comes one interval after start.
    ///
    /// Returns on the first feed error, or when the relay queue is closed.
    pub async fn run(mut self, queue: RelaySender) -> Result<(), PipelineError> {
        let period = self.interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!(
            "Feed polling started, {} events every {:?}",
            self.count,
            period
        );
        loop {
            ticker.tick().await;
            let size = self.poll_once(&queue).await?;
            log::debug!(
                "Polled {} events, cursor at {}",
                size,
                self.cursor.since_id()
            );
        }
    }
}
