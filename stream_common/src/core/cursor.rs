//! # Cursor
//!
//! The dedup watermark of a polling source. It remembers the id of the newest
//! event already fetched so the next poll only asks for newer ones.
//!
//! A cursor starts at `0`, which the feed reads as "no lower bound". It is owned
//! by exactly one source and lives only in memory; a restart begins from zero.

use crate::core::event::Event;

/// The `since_id` watermark.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    since_id: i64,
}

impl Cursor {
    /// A cursor with no lower bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// The id passed to the next fetch.
    pub fn since_id(&self) -> i64 {
        self.since_id
    }

    /// Moves the watermark past a freshly fetched batch.
    ///
    /// Batches arrive newest first, so the first event carries the new
    /// watermark. An empty batch leaves the cursor untouched. The watermark
    /// never moves backwards.
    ///
    /// Returns `true` when the watermark changed.
    pub fn advance(&mut self, batch: &[Event]) -> bool {
        match batch.first() {
            Some(newest) if newest.id > self.since_id => {
                self.since_id = newest.id;
                true
            }
            _ => false,
        }
    }
}
