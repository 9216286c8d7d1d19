//! # NATS Broker
//!
//! The production `Broker` over `async-nats`.
//!
//! The client's own reconnect machinery does the dialing. This adapter only
//! configures it from the role's `ReconnectPolicy` (fixed delay, attempt
//! budget) and forwards every lifecycle event to the `ConnectionManager`, which
//! owns logging and escalation.

use std::sync::Arc;
use std::time::Duration;

use async_nats::{ClientError, Event as NatsEvent};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;

use super::{Broker, BrokerError, MessageStream};
use crate::configs::ConnectOptions;
use crate::core::connection_manager::{ConnectionEvent, ConnectionManager, ConnectionState};

/// A live NATS connection.
#[derive(Debug)]
pub struct NatsBroker {
    client: async_nats::Client,
    connection: Arc<ConnectionManager>,
}

impl NatsBroker {
    /// Dials `address` once.
    ///
    /// A failed initial dial is returned as-is; only drops after a successful
    /// connect are retried.
    pub async fn connect(address: &str, options: &ConnectOptions) -> Result<Self, BrokerError> {
        let connection = Arc::new(ConnectionManager::new(address, options.reconnect.clone()));
        let policy = options.reconnect.clone();
        let max_reconnects = policy.max_reconnects();

        connection.record(ConnectionEvent::Connecting);

        let on_delay = connection.clone();
        let on_event = connection.clone();
        let client = async_nats::ConnectOptions::new()
            .name(options.name.as_str())
            .max_reconnects(max_reconnects)
            .reconnect_delay_callback(move |attempts| {
                reconnect_delay(&on_delay, policy.reconnect_wait, attempts)
            })
            .event_callback(move |event| {
                let connection = on_event.clone();
                async move { forward(&connection, event) }
            })
            .connect(address)
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))?;

        connection.record(ConnectionEvent::Connected);
        log::debug!("NATS client [{}] allows {} reconnects", options.name, max_reconnects);

        Ok(Self { client, connection })
    }
}

/// Delay before the client's next dial.
///
/// The initial dial goes through the same callback; it is not a reconnect, so
/// it is neither delayed nor counted.
fn reconnect_delay(connection: &ConnectionManager, wait: Duration, attempts: usize) -> Duration {
    match connection.state() {
        ConnectionState::Connected | ConnectionState::Reconnecting => {
            connection.record(ConnectionEvent::ReconnectAttempt(attempts));
            wait
        }
        _ => Duration::ZERO,
    }
}

fn forward(connection: &ConnectionManager, event: NatsEvent) {
    match event {
        NatsEvent::Connected => connection.record(ConnectionEvent::Connected),
        NatsEvent::Disconnected => connection.record(ConnectionEvent::Disconnected),
        NatsEvent::Closed | NatsEvent::ClientError(ClientError::MaxReconnects) => {
            connection.record(ConnectionEvent::Closed)
        }
        other => log::warn!("NATS event: {}", other),
    }
}

#[async_trait]
impl Broker for NatsBroker {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BrokerError> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))
    }

    async fn subscribe(&self, subject: &str) -> Result<MessageStream, BrokerError> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| BrokerError::Subscribe(e.to_string()))?;
        Ok(subscriber.map(|message| message.payload).boxed())
    }

    async fn flush(&self) -> Result<(), BrokerError> {
        self.client
            .flush()
            .await
            .map_err(|e| BrokerError::Flush(e.to_string()))
    }

    fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connection_manager::ReconnectPolicy;

    fn manager(wait_secs: u64, window_secs: u64) -> ConnectionManager {
        let policy = ReconnectPolicy::new(
            Duration::from_secs(wait_secs),
            Duration::from_secs(window_secs),
        );
        ConnectionManager::new("nats://127.0.0.1:4222", policy)
    }

    #[test]
    fn initial_dial_is_not_a_reconnect() {
        let connection = manager(1, 10);
        connection.record(ConnectionEvent::Connecting);

        assert_eq!(reconnect_delay(&connection, Duration::from_secs(1), 1), Duration::ZERO);
        assert_eq!(connection.state(), ConnectionState::Connecting);
        assert_eq!(connection.attempts(), 0);
    }

    #[test]
    fn reconnects_wait_and_are_counted() {
        let connection = manager(1, 10);
        connection.record(ConnectionEvent::Connected);

        assert_eq!(reconnect_delay(&connection, Duration::from_secs(1), 1), Duration::from_secs(1));
        assert_eq!(connection.state(), ConnectionState::Reconnecting);
        assert_eq!(connection.attempts(), 1);

        assert_eq!(reconnect_delay(&connection, Duration::from_secs(1), 2), Duration::from_secs(1));
        assert_eq!(connection.attempts(), 2);
    }

    #[test]
    fn attempt_past_the_budget_closes() {
        let connection = manager(1, 3);
        connection.record(ConnectionEvent::Connected);

        for attempt in 1..=3 {
            reconnect_delay(&connection, Duration::from_secs(1), attempt);
        }
        assert_eq!(connection.state(), ConnectionState::Reconnecting);

        reconnect_delay(&connection, Duration::from_secs(1), 4);
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert_eq!(reconnect_delay(&connection, Duration::from_secs(1), 5), Duration::ZERO);
    }

    #[test]
    fn client_events_drive_the_state_machine() {
        let connection = manager(1, 10);
        connection.record(ConnectionEvent::Connecting);

        forward(&connection, NatsEvent::Connected);
        assert_eq!(connection.state(), ConnectionState::Connected);

        forward(&connection, NatsEvent::Disconnected);
        assert_eq!(connection.state(), ConnectionState::Reconnecting);

        forward(&connection, NatsEvent::Connected);
        assert_eq!(connection.state(), ConnectionState::Connected);

        forward(&connection, NatsEvent::LameDuckMode);
        assert_eq!(connection.state(), ConnectionState::Connected);

        forward(&connection, NatsEvent::Closed);
        assert_eq!(connection.state(), ConnectionState::Closed);
    }

    #[test]
    fn max_reconnects_error_closes() {
        let connection = manager(1, 10);
        connection.record(ConnectionEvent::Connected);
        forward(&connection, NatsEvent::Disconnected);

        forward(&connection, NatsEvent::ClientError(ClientError::MaxReconnects));

        assert_eq!(connection.state(), ConnectionState::Closed);
    }
}
