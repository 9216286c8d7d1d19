//! # Phony Event Source
//!
//! Generates synthetic tweets when no feed credentials are available. On every
//! tick it emits a burst of `k` events, with `k` drawn uniformly from `0..10`.
//!
//! Ids come from the wall clock in milliseconds and are bumped past the last
//! issued id when the clock has not moved, so they stay unique and increasing
//! within a burst and across bursts.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::core::event::Event;
use crate::core::relay::RelaySender;
use crate::error::PipelineError;

/// Author of every synthetic event.
pub const PHONY_AUTHOR: &str = "John Doe";
/// Upper bound (exclusive) of a burst.
pub const MAX_BURST: usize = 10;

/// Timer-driven generator of synthetic events.
#[derive(Debug)]
pub struct PhonySource {
    interval: Duration,
    rng: StdRng,
    last_id: i64,
}

impl PhonySource {
    /// A source ticking every `interval`, seeded from the OS.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            rng: StdRng::from_os_rng(),
            last_id: 0,
        }
    }

    /// A source with a reproducible burst sequence.
    pub fn with_seed(interval: Duration, seed: u64) -> Self {
        Self {
            interval,
            rng: StdRng::seed_from_u64(seed),
            last_id: 0,
        }
    }

    /// Time between bursts.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn next_id(&mut self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }

    /// Builds the next burst without enqueuing it.
    pub fn burst(&mut self) -> Vec<Event> {
        let size = self.rng.random_range(0..MAX_BURST);
        let created_at = chrono::Local::now().to_string();

        let mut events = Vec::with_capacity(size);
        for i in 0..size {
            let id = self.next_id();
            events.push(Event::new(
                id,
                PHONY_AUTHOR,
                created_at.clone(),
                format!("foo bar baz - {}", i),
            ));
        }
        events
    }

    /// Produces one burst into the relay queue. Returns the burst size.
    pub async fn tick(&mut self, queue: &RelaySender) -> Result<usize, PipelineError> {
        let events = self.burst();
        let size = events.len();
        for event in events {
            queue.send(event).await?;
        }
        Ok(size)
    }

    /// Ticks forever; the first burst comes one interval after start.
    ///
    /// Returns only when the relay queue is closed.
    pub async fn run(mut self, queue: RelaySender) -> Result<(), PipelineError> {
        let period = self.interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!("Phony source started, one burst every {:?}", period);
        loop {
            ticker.tick().await;
            let size = self.tick(&queue).await?;
            log::debug!("Phony burst of {} events", size);
        }
    }
}
