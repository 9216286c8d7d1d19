//! # stream_common
//!
//! The shared library behind the `streamer` and `subscriber` binaries. It moves
//! tweets from an event source, through a bounded relay queue, onto a NATS
//! subject, and back out of a subscription into a handler.
//!
//! ## Layout:
//! - **`core`**: the event model and codec, the cursor, the relay queue, the
//!   connection manager, the publisher, the dispatcher and the process lifecycle.
//! - **`ingestors`**: the timer-driven event sources (phony and feed polling).
//! - **`retrieve`**: the feed capability and the home timeline HTTP client.
//! - **`connections`**: the `Broker` seam with NATS and in-memory adapters.
//! - **`configs`**: credentials, connection options and per-binary settings.
//! - **`loggers`**: `fern` based logging setup with log file rotation.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod configs;
pub mod connections;
pub mod core;
pub mod error;
pub mod ingestors;
pub mod loggers;
pub mod retrieve;

// Re-export the types every binary touches.
pub use crate::core::event::{Event, User};
pub use crate::error::PipelineError;
