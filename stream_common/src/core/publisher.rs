//! # Publisher
//!
//! Drains the relay queue onto one broker subject, one event at a time and in
//! queue order.
//!
//! Encoding failures are fatal. Broker send failures are not: the event is
//! logged and dropped, and the `ConnectionManager` decides whether the outage
//! becomes fatal. Nothing is buffered for replay.

use std::sync::Arc;

use crate::connections::Broker;
use crate::core::event::Event;
use crate::core::relay::RelayReceiver;
use crate::error::PipelineError;

/// Publishes relay queue events to a subject.
pub struct Publisher {
    broker: Arc<dyn Broker>,
    subject: String,
}

impl Publisher {
    /// Creates a publisher for `subject`.
    pub fn new(broker: Arc<dyn Broker>, subject: impl Into<String>) -> Self {
        Self {
            broker,
            subject: subject.into(),
        }
    }

    /// The subject events are published to.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Publishes until the queue's producer is gone and the queue is drained.
    pub async fn run(&self, mut queue: RelayReceiver) -> Result<(), PipelineError> {
        while let Some(event) = queue.recv().await {
            self.publish(&event).await?;
        }
        log::debug!("Relay queue drained, publisher on [{}] stopping", self.subject);
        Ok(())
    }

    /// Encodes and sends one event.
    pub async fn publish(&self, event: &Event) -> Result<(), PipelineError> {
        let payload = event.encode()?;

        log::info!("Publishing from [{}]:\n  '{}'", event.author(), event.text);

        if let Err(e) = self.broker.publish(&self.subject, payload).await {
            log::warn!(
                "Dropped event {} on [{}]: {}",
                event.id,
                self.subject,
                e
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::{MemoryBroker, MemoryHub};
    use crate::core::connection_manager::{ConnectionManager, ReconnectPolicy};
    use crate::core::relay::relay_queue;
    use futures_util::StreamExt;

    async fn broker(hub: &MemoryHub) -> Arc<MemoryBroker> {
        let connection = Arc::new(ConnectionManager::new("memory://hub", ReconnectPolicy::default()));
        Arc::new(MemoryBroker::connect(hub, connection).await.unwrap())
    }

    #[tokio::test]
    async fn publishes_in_queue_order() {
        let hub = MemoryHub::new();
        let broker = broker(&hub).await;
        let mut sub = broker.subscribe("tweet").await.unwrap();

        let (tx, rx) = relay_queue(4);
        let publisher = Publisher::new(broker.clone(), "tweet");
        let producer = tokio::spawn(async move {
            for id in 1..=6 {
                tx.send(Event::new(id, "John Doe", "", format!("foo bar baz - {}", id)))
                    .await
                    .unwrap();
            }
        });

        publisher.run(rx).await.unwrap();
        producer.await.unwrap();

        for id in 1..=6 {
            let event = Event::decode(&sub.next().await.unwrap()).unwrap();
            assert_eq!(event.id, id);
        }
    }

    #[tokio::test]
    async fn send_failure_drops_the_event_and_continues() {
        let hub = MemoryHub::new();
        let broker = broker(&hub).await;
        let publisher = Publisher::new(broker, "tweet");

        hub.set_online(false);
        let result = publisher.publish(&Event::new(1, "John Doe", "", "lost")).await;

        assert!(result.is_ok());
    }
}
