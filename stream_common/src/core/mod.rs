//! # Core Pipeline Module
//!
//! This module forms the heart of the tweet streaming pipeline. It holds every
//! component that carries state between the event source and the broker, and
//! between the broker and the subscriber's handler.
//!
//! ## Core Components:
//!
//! - **`event`**: the `Event` record and its JSON wire codec.
//! - **`cursor`**: the `since_id` watermark that keeps a polling source from
//!   re-fetching events it has already seen.
//! - **`relay`**: the bounded, single-producer single-consumer hand-off between
//!   the event source and the publisher. A full queue suspends the producer.
//! - **`connection_manager`**: the per-role connection state machine and the
//!   bounded reconnect policy. Exhausting the budget is fatal.
//! - **`publisher`**: drains the relay queue onto a broker subject.
//! - **`dispatcher`**: decodes inbound messages and hands them to an
//!   `EventHandler`.
//! - **`lifecycle`**: runs a role until it fails or is told to stop.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// The dedup watermark for polling sources.
pub mod cursor;
/// Connection state machine and reconnect budget.
pub mod connection_manager;
/// Subscribe, decode and dispatch.
pub mod dispatcher;
/// The event record and its codec.
pub mod event;
/// Run-until-cancelled orchestration for both roles.
pub mod lifecycle;
/// Relay queue drain loop.
pub mod publisher;
/// Bounded FIFO between source and publisher.
pub mod relay;

// --- Public API Re-exports ---
pub use connection_manager::{ConnectionEvent, ConnectionManager, ConnectionState, ReconnectPolicy};
pub use cursor::Cursor;
pub use dispatcher::{Dispatcher, EventHandler, LogSummary};
pub use event::{CodecError, Event, User};
pub use publisher::Publisher;
pub use relay::{relay_queue, RelayReceiver, RelaySender};
