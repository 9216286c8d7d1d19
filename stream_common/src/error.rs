//! # Pipeline Errors
//!
//! Every condition that stops a role (streamer or subscriber) ends up as a
//! `PipelineError`. Components return it instead of exiting; the binaries log it
//! and terminate with a non-zero status.

use thiserror::Error;

use crate::connections::BrokerError;
use crate::core::event::CodecError;
use crate::retrieve::FetchError;

/// Terminal outcome of a streaming or subscribing role.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The initial broker connection could not be established.
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        /// Broker address that was dialed.
        address: String,
        /// Underlying broker failure.
        #[source]
        source: BrokerError,
    },

    /// The reconnect budget ran out and the connection is closed for good.
    #[error("Exiting, no servers available")]
    ConnectionClosed,

    /// Polling the upstream feed failed.
    #[error("Feed polling failed: {0}")]
    Fetch(#[from] FetchError),

    /// An event could not be encoded or a payload could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Subscribing to a subject failed.
    #[error("Failed to subscribe to [{subject}]: {source}")]
    Subscribe {
        /// Subject that was requested.
        subject: String,
        /// Underlying broker failure.
        #[source]
        source: BrokerError,
    },

    /// The protocol handshake after subscribing could not be confirmed.
    #[error("Failed to flush subscription on [{subject}]: {source}")]
    Flush {
        /// Subject that was subscribed.
        subject: String,
        /// Underlying broker failure.
        #[source]
        source: BrokerError,
    },

    /// The broker ended a subscription; no further events will arrive.
    #[error("Subscription on [{subject}] ended")]
    SubscriptionEnded {
        /// Subject that was subscribed.
        subject: String,
    },

    /// The consumer side of the relay queue is gone.
    #[error("Relay queue closed")]
    QueueClosed,

    /// A pipeline task panicked or was cancelled.
    #[error("Pipeline task failed: {0}")]
    Task(String),
}
