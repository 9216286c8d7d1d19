//! # Connections Module
//!
//! This module handles the connection to the message broker. Both roles talk to
//! the broker only through the `Broker` trait, so the pipeline is independent
//! of the transport.
//!
//! ## Contained Modules:
//! - **`broker_nats`**: the production adapter over `async-nats`. Its client
//!   reconnects on its own; the adapter reports every lifecycle event to the
//!   role's `ConnectionManager`.
//! - **`broker_memory`**: an in-process adapter over `tokio::sync::broadcast`.
//!   The link can be severed and restored, which lets the test suites exercise
//!   the reconnect policy without a running server.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::core::connection_manager::ConnectionManager;

/// In-process broker, always available.
pub mod broker_memory;
/// NATS broker adapter.
#[cfg(feature = "nats")]
pub mod broker_nats;

pub use broker_memory::{MemoryBroker, MemoryHub};
#[cfg(feature = "nats")]
pub use broker_nats::NatsBroker;

/// Errors raised by a broker adapter.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Dialing the broker failed.
    #[error("connect failed: {0}")]
    Connect(String),
    /// The link to the broker is down.
    #[error("not connected")]
    Disconnected,
    /// A message could not be handed to the broker.
    #[error("publish failed: {0}")]
    Publish(String),
    /// The broker refused or lost a subscription.
    #[error("subscribe failed: {0}")]
    Subscribe(String),
    /// The broker did not confirm pending protocol traffic.
    #[error("flush failed: {0}")]
    Flush(String),
}

/// Raw payloads delivered on a subscription, in broker order.
pub type MessageStream = BoxStream<'static, Bytes>;

/// # Broker
///
/// The narrow transport interface used by the publisher and the dispatcher.
///
/// Implementations own their reconnect mechanics and report state changes to
/// the `ConnectionManager` returned by `connection()`.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Sends one payload to every current subscriber of `subject`.
    ///
    /// Delivery is at-most-once: a payload sent while no link is up is lost.
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BrokerError>;

    /// Opens an asynchronous subscription on `subject`.
    async fn subscribe(&self, subject: &str) -> Result<MessageStream, BrokerError>;

    /// Waits until the broker has processed everything sent so far.
    async fn flush(&self) -> Result<(), BrokerError>;

    /// The manager tracking this broker connection.
    fn connection(&self) -> &Arc<ConnectionManager>;
}
