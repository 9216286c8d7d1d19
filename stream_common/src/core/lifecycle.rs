//! # Role Lifecycle
//!
//! Runs a role's pipeline until the first of three things happens:
//!
//! 1. The pipeline itself returns (an error, or the end of its input).
//! 2. The role's `ConnectionManager` reaches `Closed`.
//! 3. The process receives `CTRL+C` or `SIGTERM`.
//!
//! Cases 1 and 2 carry the outcome the binary turns into an exit status; a
//! shutdown signal is a clean stop.

use std::future::Future;
use std::sync::Arc;

use tokio::signal;
use tokio::task::JoinHandle;

use crate::connections::Broker;
use crate::core::connection_manager::ConnectionManager;
use crate::core::publisher::Publisher;
use crate::core::relay::relay_queue;
use crate::error::PipelineError;
use crate::ingestors::EventSource;

/// # Shutdown Signal
///
/// Resolves on `CTRL+C`, or on `SIGTERM` on UNIX-like systems.
///
/// If a handler cannot be installed the failure is logged and that signal is
/// never observed.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Runs `pipeline` until it finishes, `connection` closes, or `shutdown`
/// resolves.
pub async fn run_until<P, S>(
    pipeline: P,
    connection: &ConnectionManager,
    shutdown: S,
) -> Result<(), PipelineError>
where
    P: Future<Output = Result<(), PipelineError>>,
    S: Future<Output = ()>,
{
    tokio::select! {
        result = pipeline => result,
        err = connection.closed() => Err(err),
        _ = shutdown => {
            log::warn!("Shutdown signal received, stopping");
            Ok(())
        }
    }
}

/// `run_until` bound to the process shutdown signals.
pub async fn run_until_shutdown<P>(
    pipeline: P,
    connection: &ConnectionManager,
) -> Result<(), PipelineError>
where
    P: Future<Output = Result<(), PipelineError>>,
{
    run_until(pipeline, connection, shutdown_signal()).await
}

/// # Streamer Pipeline
///
/// Wires `source` to a `Publisher` on `subject` through a relay queue of
/// `capacity` slots. The source runs on its own task.
///
/// Returns when either side fails. A publisher failure closes the queue, which
/// in turn stops the source; a source failure lets the publisher drain what is
/// already queued before the error is returned.
pub async fn stream(
    source: EventSource,
    broker: Arc<dyn Broker>,
    subject: &str,
    capacity: usize,
) -> Result<(), PipelineError> {
    let (tx, rx) = relay_queue(capacity);
    let publisher = Publisher::new(broker, subject);

    // --- Phase 1: Start the source task ---
    // Dropping `stream` (shutdown, `Closed`, or a publisher error) aborts it.
    let mut source_task = AbortOnDrop(tokio::spawn(source.run(tx)));

    // --- Phase 2: Publish until the queue closes, then collect the source ---
    publisher.run(rx).await?;
    (&mut source_task.0)
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))?
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
