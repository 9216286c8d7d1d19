//! # Dispatcher
//!
//! The subscriber side of the pipeline. The `Dispatcher` subscribes to a
//! subject, confirms the subscription with a flush, then decodes each inbound
//! payload and hands the event to an `EventHandler`.
//!
//! ## Rules:
//! - **Order**: handlers are invoked one at a time, in delivery order.
//! - **Empty payloads**: skipped silently.
//! - **Corrupt payloads**: a payload that does not decode is fatal.
//! - **Unconfirmed subscription**: a failed flush after subscribing is fatal.
//! - **Ended subscription**: fatal, whether or not `Closed` was reported first.

use std::sync::Arc;

use futures_util::StreamExt;

use crate::connections::{Broker, MessageStream};
use crate::core::event::Event;
use crate::error::PipelineError;

/// # Event Handler
///
/// Receives every decoded event. Any `Fn(Event)` closure is a handler.
pub trait EventHandler: Send + Sync {
    /// Consumes one event.
    fn handle(&self, event: Event);
}

impl<F> EventHandler for F
where
    F: Fn(Event) + Send + Sync,
{
    fn handle(&self, event: Event) {
        self(event)
    }
}

/// The default handler: logs the author and the text of every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSummary;

impl EventHandler for LogSummary {
    fn handle(&self, event: Event) {
        log::info!("Received from [{}]:\n  '{}'", event.author(), event.text);
    }
}

/// Subscribes to a subject and dispatches decoded events.
pub struct Dispatcher<H> {
    broker: Arc<dyn Broker>,
    subject: String,
    handler: H,
}

impl<H: EventHandler> Dispatcher<H> {
    /// Creates a dispatcher for `subject`.
    pub fn new(broker: Arc<dyn Broker>, subject: impl Into<String>, handler: H) -> Self {
        Self {
            broker,
            subject: subject.into(),
            handler,
        }
    }

    /// Subscribes and flushes; returns the live subscription.
    pub async fn listen(&self) -> Result<MessageStream, PipelineError> {
        let stream = self
            .broker
            .subscribe(&self.subject)
            .await
            .map_err(|source| PipelineError::Subscribe {
                subject: self.subject.clone(),
                source,
            })?;

        self.broker
            .flush()
            .await
            .map_err(|source| PipelineError::Flush {
                subject: self.subject.clone(),
                source,
            })?;

        log::info!("Listening on [{}]", self.subject);
        Ok(stream)
    }

    /// Dispatches until a payload fails to decode or the subscription ends.
    ///
    /// Never returns `Ok`: a subscription only ends when the client has given
    /// up on the connection, which is as fatal as `Closed` itself.
    pub async fn dispatch(&self, mut stream: MessageStream) -> Result<(), PipelineError> {
        while let Some(payload) = stream.next().await {
            self.dispatch_payload(&payload)?;
        }
        Err(PipelineError::SubscriptionEnded {
            subject: self.subject.clone(),
        })
    }

    /// Decodes one payload and hands it to the handler.
    ///
    /// Returns `false` for an empty payload, which is skipped.
    pub fn dispatch_payload(&self, payload: &[u8]) -> Result<bool, PipelineError> {
        if payload.is_empty() {
            return Ok(false);
        }
        let event = Event::decode(payload)?;
        self.handler.handle(event);
        Ok(true)
    }

    /// `listen` followed by `dispatch`.
    pub async fn run(&self) -> Result<(), PipelineError> {
        let stream = self.listen().await?;
        self.dispatch(stream).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::{BrokerError, MemoryBroker, MemoryHub};
    use crate::core::connection_manager::{ConnectionEvent, ConnectionManager, ReconnectPolicy};
    use crate::core::event::CodecError;
    use crate::core::lifecycle::run_until;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    fn collecting() -> (Arc<Mutex<Vec<Event>>>, impl EventHandler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |event: Event| sink.lock().unwrap().push(event))
    }

    async fn dispatcher<H: EventHandler>(hub: &MemoryHub, handler: H) -> Dispatcher<H> {
        let connection = Arc::new(ConnectionManager::new("memory://hub", ReconnectPolicy::default()));
        let broker = MemoryBroker::connect(hub, connection).await.unwrap();
        Dispatcher::new(Arc::new(broker), "tweet", handler)
    }

    #[tokio::test]
    async fn skips_empty_payloads() {
        let (seen, handler) = collecting();
        let dispatcher = dispatcher(&MemoryHub::new(), handler).await;

        assert!(!dispatcher.dispatch_payload(b"").unwrap());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_payload_is_fatal() {
        let (seen, handler) = collecting();
        let dispatcher = dispatcher(&MemoryHub::new(), handler).await;

        let err = dispatcher.dispatch_payload(b"not json").unwrap_err();

        assert!(matches!(err, PipelineError::Codec(CodecError::Decode(_))));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dispatches_in_delivery_order() {
        let hub = MemoryHub::new();
        let (seen, handler) = collecting();
        let dispatcher = dispatcher(&hub, handler).await;
        let stream = dispatcher.listen().await.unwrap();

        let connection = Arc::new(ConnectionManager::new("memory://hub", ReconnectPolicy::default()));
        let publisher = MemoryBroker::connect(&hub, connection).await.unwrap();
        for id in 1..=3 {
            let event = Event::new(id, "John Doe", "", format!("foo bar baz - {}", id));
            publisher.publish("tweet", event.encode().unwrap()).await.unwrap();
        }
        publisher.publish("tweet", bytes::Bytes::new()).await.unwrap();
        publisher.publish("tweet", bytes::Bytes::from_static(b"{")).await.unwrap();

        let result = dispatcher.dispatch(stream).await;

        assert!(matches!(result, Err(PipelineError::Codec(_))));
        let ids: Vec<i64> = seen.lock().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    /// Delivers `payloads`, ends the subscription, then reports `Closed` from
    /// another task, the way the NATS client behaves once reconnects run out.
    struct EndingBroker {
        payloads: Vec<Bytes>,
        connection: Arc<ConnectionManager>,
    }

    #[async_trait]
    impl Broker for EndingBroker {
        async fn publish(&self, _subject: &str, _payload: Bytes) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn subscribe(&self, _subject: &str) -> Result<MessageStream, BrokerError> {
            let connection = self.connection.clone();
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                connection.record(ConnectionEvent::Closed);
            });
            Ok(futures_util::stream::iter(self.payloads.clone()).boxed())
        }

        async fn flush(&self) -> Result<(), BrokerError> {
            Ok(())
        }

        fn connection(&self) -> &Arc<ConnectionManager> {
            &self.connection
        }
    }

    fn ending_broker(payloads: Vec<Bytes>) -> Arc<EndingBroker> {
        let connection = ConnectionManager::new("nats://127.0.0.1:4222", ReconnectPolicy::default());
        connection.record(ConnectionEvent::Connected);
        Arc::new(EndingBroker {
            payloads,
            connection: Arc::new(connection),
        })
    }

    #[tokio::test]
    async fn ended_subscription_is_fatal() {
        let (seen, handler) = collecting();
        let event = Event::new(7, "John Doe", "", "foo bar baz - 0");
        let broker = ending_broker(vec![event.encode().unwrap()]);
        let dispatcher = Dispatcher::new(broker, "tweet", handler);

        let stream = dispatcher.listen().await.unwrap();
        let result = dispatcher.dispatch(stream).await;

        assert!(matches!(
            result,
            Err(PipelineError::SubscriptionEnded { ref subject }) if subject.as_str() == "tweet"
        ));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lost_connection_never_stops_cleanly() {
        let broker = ending_broker(Vec::new());
        let connection = broker.connection().clone();
        let dispatcher = Dispatcher::new(broker, "tweet", LogSummary);

        let result = run_until(dispatcher.run(), &connection, std::future::pending::<()>()).await;

        assert!(matches!(
            result,
            Err(PipelineError::SubscriptionEnded { .. }) | Err(PipelineError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn unreachable_broker_fails_listen() {
        let hub = MemoryHub::new();
        let dispatcher = dispatcher(&hub, LogSummary).await;
        hub.set_online(false);

        assert!(matches!(
            dispatcher.listen().await,
            Err(PipelineError::Subscribe { .. }) | Err(PipelineError::Flush { .. })
        ));
    }
}
