//! # In-Memory Broker
//!
//! A process-local stand-in for the NATS server, built on tokio broadcast
//! channels. A `MemoryHub` plays the server: one broadcast channel per subject
//! and an online flag. Each `MemoryBroker` is one client link to the hub.
//!
//! Taking the hub offline severs every link. Each broker then runs its
//! `ConnectionManager` reconnect loop against the hub, the same way the NATS
//! client retries a lost server. Subscriptions survive a reconnect; payloads
//! published while the link is down are lost.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::{Broker, BrokerError, MessageStream};
use crate::core::connection_manager::{ConnectionEvent, ConnectionManager};

/// Per-subject broadcast capacity.
const CHANNEL_CAPACITY: usize = 1024;

/// The shared "server" side of the in-memory broker.
#[derive(Debug, Clone)]
pub struct MemoryHub {
    subjects: Arc<Mutex<HashMap<String, broadcast::Sender<Bytes>>>>,
    online: Arc<watch::Sender<bool>>,
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHub {
    /// Creates an online hub with no subjects.
    pub fn new() -> Self {
        let (online, _) = watch::channel(true);
        Self {
            subjects: Arc::new(Mutex::new(HashMap::new())),
            online: Arc::new(online),
        }
    }

    /// Brings the hub up or takes it down.
    pub fn set_online(&self, online: bool) {
        self.online.send_replace(online);
    }

    /// `true` while the hub accepts traffic.
    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    fn watch_online(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    fn channel(&self, subject: &str) -> broadcast::Sender<Bytes> {
        let mut subjects = self
            .subjects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subjects
            .entry(subject.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

/// A client link to a `MemoryHub`.
#[derive(Debug)]
pub struct MemoryBroker {
    hub: MemoryHub,
    link_up: Arc<AtomicBool>,
    connection: Arc<ConnectionManager>,
    supervisor: JoinHandle<()>,
}

impl MemoryBroker {
    /// Opens a link to `hub`, reporting its lifecycle to `connection`.
    ///
    /// Fails if the hub is offline. Must be called inside a tokio runtime.
    pub async fn connect(
        hub: &MemoryHub,
        connection: Arc<ConnectionManager>,
    ) -> Result<Self, BrokerError> {
        connection.record(ConnectionEvent::Connecting);
        if !hub.is_online() {
            return Err(BrokerError::Connect(format!(
                "{} is offline",
                connection.address()
            )));
        }
        connection.record(ConnectionEvent::Connected);

        let link_up = Arc::new(AtomicBool::new(true));
        let supervisor = tokio::spawn(supervise(
            hub.clone(),
            link_up.clone(),
            connection.clone(),
        ));

        Ok(Self {
            hub: hub.clone(),
            link_up,
            connection,
            supervisor,
        })
    }

    fn is_up(&self) -> bool {
        self.link_up.load(Ordering::SeqCst) && self.hub.is_online()
    }
}

impl Drop for MemoryBroker {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}

/// Watches the hub and runs the reconnect loop each time it goes offline.
async fn supervise(hub: MemoryHub, link_up: Arc<AtomicBool>, connection: Arc<ConnectionManager>) {
    let mut online = hub.watch_online();
    loop {
        let hub_gone = online.wait_for(|up| !*up).await.is_err();
        if hub_gone {
            return;
        }
        link_up.store(false, Ordering::SeqCst);

        let result = connection
            .reconnect_with(|| {
                let hub = hub.clone();
                async move {
                    if hub.is_online() {
                        Ok(())
                    } else {
                        Err(BrokerError::Disconnected)
                    }
                }
            })
            .await;

        match result {
            Ok(()) => link_up.store(true, Ordering::SeqCst),
            Err(_) => return,
        }
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BrokerError> {
        if !self.is_up() {
            return Err(BrokerError::Disconnected);
        }
        // A subject without subscribers swallows the payload, like a NATS server.
        let _ = self.hub.channel(subject).send(payload);
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<MessageStream, BrokerError> {
        if !self.is_up() {
            return Err(BrokerError::Disconnected);
        }
        let rx = self.hub.channel(subject).subscribe();

        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(payload) => return Some((payload, rx)),
                    Err(RecvError::Lagged(missed)) => {
                        log::warn!("Subscription lagged, {} messages lost", missed);
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });
        Ok(stream.boxed())
    }

    async fn flush(&self) -> Result<(), BrokerError> {
        if self.is_up() {
            Ok(())
        } else {
            Err(BrokerError::Flush("not connected".to_string()))
        }
    }

    fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connection_manager::{ConnectionState, ReconnectPolicy};
    use std::time::Duration;

    const ADDRESS: &str = "memory://hub";

    fn manager(window_secs: u64) -> Arc<ConnectionManager> {
        Arc::new(ConnectionManager::new(
            ADDRESS,
            ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(window_secs)),
        ))
    }

    #[tokio::test]
    async fn delivers_to_every_subscriber() {
        let hub = MemoryHub::new();
        let broker = MemoryBroker::connect(&hub, manager(10)).await.unwrap();

        let mut first = broker.subscribe("tweet").await.unwrap();
        let mut second = broker.subscribe("tweet").await.unwrap();
        broker.publish("tweet", Bytes::from_static(b"hello")).await.unwrap();

        assert_eq!(first.next().await.unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(second.next().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn connect_fails_when_hub_is_offline() {
        let hub = MemoryHub::new();
        hub.set_online(false);

        let result = MemoryBroker::connect(&hub, manager(10)).await;
        assert!(matches!(result, Err(BrokerError::Connect(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_a_short_outage() {
        let hub = MemoryHub::new();
        let connection = manager(10);
        let broker = MemoryBroker::connect(&hub, connection.clone()).await.unwrap();
        let mut sub = broker.subscribe("tweet").await.unwrap();

        hub.set_online(false);
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(connection.state(), ConnectionState::Reconnecting);
        assert!(broker.publish("tweet", Bytes::from_static(b"lost")).await.is_err());

        hub.set_online(true);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(connection.state(), ConnectionState::Connected);

        broker.publish("tweet", Bytes::from_static(b"back")).await.unwrap();
        assert_eq!(sub.next().await.unwrap(), Bytes::from_static(b"back"));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_outage_closes_the_connection() {
        let hub = MemoryHub::new();
        let connection = manager(5);
        let _broker = MemoryBroker::connect(&hub, connection.clone()).await.unwrap();

        hub.set_online(false);
        connection.closed().await;

        assert_eq!(connection.state(), ConnectionState::Closed);
        assert_eq!(connection.attempts(), 5);
    }
}
