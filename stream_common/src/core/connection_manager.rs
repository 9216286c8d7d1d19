//! # Connection Manager
//!
//! Owns the lifecycle of one logical broker connection per role (publisher side
//! or subscriber side) and applies the same resilience policy to both.
//!
//! ## State Machine:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> (drop) Reconnecting -> Connected
//!                                                                -> Closed (fatal)
//! ```
//!
//! - **Reconnect budget**: reconnects are attempted every `reconnect_wait`, at
//!   most `floor(reconnect_window / reconnect_wait)` times.
//! - **Visibility**: every disconnect, attempt and recovery is logged.
//! - **Escalation**: once the budget is spent the state becomes `Closed`, which
//!   is terminal. `closed()` resolves and the owning role shuts the process down.
//! - **No replay**: the manager never buffers events across a disconnect.
//!
//! Broker adapters feed the manager with `ConnectionEvent`s. Adapters whose
//! client library reconnects on its own (NATS) only report; adapters without
//! one (the in-memory broker) drive `reconnect_with`.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use crate::error::PipelineError;

/// Observable state of a broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial state, nothing dialed yet.
    Disconnected,
    /// Initial dial in progress.
    Connecting,
    /// Connected and usable.
    Connected,
    /// Dropped; reconnect attempts are running.
    Reconnecting,
    /// Reconnect budget exhausted. Terminal.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Lifecycle notifications reported by a broker adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The initial dial started.
    Connecting,
    /// The connection is (again) established.
    Connected,
    /// The connection dropped unexpectedly.
    Disconnected,
    /// Reconnect attempt number `n` (1-based) is starting.
    ReconnectAttempt(usize),
    /// The client gave up; no further attempts will be made.
    Closed,
}

/// # Reconnect Policy
///
/// Fixed backoff with a total window. The attempt budget is derived, not
/// configured: `floor(reconnect_window / reconnect_wait)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before each reconnect attempt.
    pub reconnect_wait: Duration,
    /// Total time the manager keeps trying before giving up.
    pub reconnect_window: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            reconnect_wait: Duration::from_secs(1),
            reconnect_window: Duration::from_secs(10 * 60),
        }
    }
}

impl ReconnectPolicy {
    /// Builds a policy from a backoff and a window.
    pub fn new(reconnect_wait: Duration, reconnect_window: Duration) -> Self {
        Self {
            reconnect_wait,
            reconnect_window,
        }
    }

    /// Maximum number of reconnect attempts.
    ///
    /// A zero backoff yields no attempts at all.
    pub fn max_reconnects(&self) -> usize {
        let wait = self.reconnect_wait.as_nanos();
        if wait == 0 {
            return 0;
        }
        (self.reconnect_window.as_nanos() / wait) as usize
    }
}

/// # Connection Manager
///
/// Tracks the state of a single broker connection and enforces the reconnect
/// budget. Shared between the broker adapter (which reports) and the role's
/// run loop (which waits on `closed()`), usually behind an `Arc`.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Broker address, used in log lines.
    address: String,
    policy: ReconnectPolicy,
    state: watch::Sender<ConnectionState>,
    /// Attempts made during the current outage.
    attempts: AtomicUsize,
}

impl ConnectionManager {
    /// Creates a manager in the `Disconnected` state.
    pub fn new(address: impl Into<String>, policy: ReconnectPolicy) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            address: address.into(),
            policy,
            state,
            attempts: AtomicUsize::new(0),
        }
    }

    /// The broker address this manager supervises.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The reconnect policy in force.
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A read-only view of the state for observers.
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Reconnect attempts made during the current outage.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Applies a lifecycle notification to the state machine.
    ///
    /// Events arriving after `Closed` are ignored.
    pub fn record(&self, event: ConnectionEvent) {
        let current = self.state();
        if current == ConnectionState::Closed {
            return;
        }

        match event {
            ConnectionEvent::Connecting => {
                log::debug!("Connecting to [{}]", self.address);
                self.set(ConnectionState::Connecting);
            }
            ConnectionEvent::Connected => {
                // Adapters and client callbacks may both report the same connect.
                match current {
                    ConnectionState::Connected => {}
                    ConnectionState::Reconnecting => log::info!("Reconnected [{}]", self.address),
                    _ => log::info!("Connected to [{}]", self.address),
                }
                self.attempts.store(0, Ordering::SeqCst);
                self.set(ConnectionState::Connected);
            }
            ConnectionEvent::Disconnected => self.drop_link(current),
            ConnectionEvent::ReconnectAttempt(n) => {
                // An attempt may be reported before the disconnect itself.
                self.drop_link(current);
                let max = self.policy.max_reconnects();
                self.attempts.store(n, Ordering::SeqCst);
                if n > max {
                    self.close();
                    return;
                }
                log::info!("Reconnect attempt {}/{} to [{}]", n, max, self.address);
            }
            ConnectionEvent::Closed => self.close(),
        }
    }

    /// Resolves once the connection is `Closed`, yielding the fatal error the
    /// owning role should return.
    pub async fn closed(&self) -> PipelineError {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the wait can only end on `Closed`.
        let _ = rx.wait_for(|state| *state == ConnectionState::Closed).await;
        PipelineError::ConnectionClosed
    }

    /// Runs the reconnect loop for an adapter without built-in reconnects.
    ///
    /// Waits `reconnect_wait` before each call to `attempt`, up to the budget.
    /// The first success moves the state back to `Connected`. Running out of
    /// attempts closes the connection and returns `ConnectionClosed`.
    pub async fn reconnect_with<T, E, F, Fut>(&self, mut attempt: F) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.record(ConnectionEvent::Disconnected);

        for n in 1..=self.policy.max_reconnects() {
            tokio::time::sleep(self.policy.reconnect_wait).await;
            if self.state() == ConnectionState::Closed {
                break;
            }
            self.record(ConnectionEvent::ReconnectAttempt(n));

            match attempt().await {
                Ok(connection) => {
                    self.record(ConnectionEvent::Connected);
                    return Ok(connection);
                }
                Err(e) => log::warn!("Reconnect attempt {} failed: {}", n, e),
            }
        }

        self.close();
        Err(PipelineError::ConnectionClosed)
    }

    fn drop_link(&self, current: ConnectionState) {
        if current != ConnectionState::Reconnecting {
            log::warn!(
                "Disconnected: will attempt reconnects for {:.0}m",
                self.policy.reconnect_window.as_secs_f64() / 60.0
            );
            self.set(ConnectionState::Reconnecting);
        }
    }

    fn close(&self) {
        if self.state() != ConnectionState::Closed {
            log::error!("Exiting, no servers available");
            self.set(ConnectionState::Closed);
        }
    }

    fn set(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loggers::capture;
    use std::sync::Arc;

    fn connected(policy: ReconnectPolicy) -> ConnectionManager {
        let manager = ConnectionManager::new("nats://127.0.0.1:4222", policy);
        manager.record(ConnectionEvent::Connecting);
        manager.record(ConnectionEvent::Connected);
        manager
    }

    #[test]
    fn default_budget_is_ten_minutes_of_one_second_waits() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.reconnect_wait, Duration::from_secs(1));
        assert_eq!(policy.reconnect_window, Duration::from_secs(600));
        assert_eq!(policy.max_reconnects(), 600);
    }

    #[test]
    fn budget_is_floor_of_window_over_wait() {
        let policy = ReconnectPolicy::new(Duration::from_secs(3), Duration::from_secs(10));
        assert_eq!(policy.max_reconnects(), 3);
        assert_eq!(ReconnectPolicy::new(Duration::ZERO, Duration::from_secs(10)).max_reconnects(), 0);
    }

    #[test]
    fn follows_the_lifecycle() {
        let manager = ConnectionManager::new("nats://127.0.0.1:4222", ReconnectPolicy::default());
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        manager.record(ConnectionEvent::Connecting);
        assert_eq!(manager.state(), ConnectionState::Connecting);

        manager.record(ConnectionEvent::Connected);
        assert_eq!(manager.state(), ConnectionState::Connected);

        manager.record(ConnectionEvent::Disconnected);
        assert_eq!(manager.state(), ConnectionState::Reconnecting);

        manager.record(ConnectionEvent::ReconnectAttempt(1));
        assert_eq!(manager.attempts(), 1);

        manager.record(ConnectionEvent::Connected);
        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(manager.attempts(), 0);
    }

    #[test]
    fn repeated_connect_is_logged_once() {
        capture::install();
        let manager = ConnectionManager::new("nats://twice-reported:4222", ReconnectPolicy::default());

        manager.record(ConnectionEvent::Connecting);
        manager.record(ConnectionEvent::Connected);
        manager.record(ConnectionEvent::Connected);

        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(capture::count_containing("Connected to [nats://twice-reported:4222]"), 1);
    }

    #[test]
    fn closed_is_terminal() {
        let manager = connected(ReconnectPolicy::default());
        manager.record(ConnectionEvent::Closed);
        manager.record(ConnectionEvent::Connected);
        assert_eq!(manager.state(), ConnectionState::Closed);
    }

    #[test]
    fn attempt_beyond_budget_closes() {
        let manager = connected(ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(2)));
        manager.record(ConnectionEvent::Disconnected);
        manager.record(ConnectionEvent::ReconnectAttempt(2));
        assert_eq!(manager.state(), ConnectionState::Reconnecting);

        manager.record(ConnectionEvent::ReconnectAttempt(3));
        assert_eq!(manager.state(), ConnectionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_gives_up_after_ten_attempts() {
        let manager = connected(ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(10)));
        let tries = Arc::new(AtomicUsize::new(0));

        let counter = tries.clone();
        let started = tokio::time::Instant::now();
        let result = manager
            .reconnect_with(|| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("connection refused") }
            })
            .await;

        assert!(matches!(result, Err(PipelineError::ConnectionClosed)));
        assert_eq!(tries.load(Ordering::SeqCst), 10);
        assert_eq!(manager.state(), ConnectionState::Closed);
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_recovers_within_budget() {
        let manager = connected(ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(10)));
        let tries = Arc::new(AtomicUsize::new(0));

        let counter = tries.clone();
        let result = manager
            .reconnect_with(|| {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err("connection refused")
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn closed_resolves_on_escalation() {
        let manager = Arc::new(connected(ReconnectPolicy::default()));

        let waiter = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.closed().await })
        };
        tokio::task::yield_now().await;
        manager.record(ConnectionEvent::Closed);

        assert!(matches!(waiter.await.unwrap(), PipelineError::ConnectionClosed));
    }
}
