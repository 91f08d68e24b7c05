//! Graceful-shutdown signaling.
//!
//! One [`Shutdown`] handle is created by the supervisor and cloned into
//! every session. The termination-signal task is its only writer: it sets
//! the flag (once set, never reset) and wakes every waiter. Sessions read
//! the flag at the top of their loop and race `notified()` against their
//! socket reads, so a shutdown interrupts idle sessions immediately instead
//! of waiting for the next message.

use std::{
    pin::pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::{
    signal::unix::{SignalKind, signal},
    sync::Notify,
};

use crate::error::ServerError;

/// Shared shutdown flag with wakeup.
#[derive(Debug, Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    triggered: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    /// Create an untriggered handle.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Arc::new(Inner { triggered: AtomicBool::new(false), notify: Notify::new() }) }
    }

    /// Trip the flag and wake every waiter. Idempotent.
    pub fn trigger(&self) {
        if !self.inner.triggered.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown is requested; immediately if it already was.
    pub async fn notified(&self) {
        // Register with the Notify before re-checking the flag: a trigger
        // landing between the check and the await would otherwise be lost,
        // because notify_waiters only wakes already-registered waiters.
        let mut notified = pin!(self.inner.notify.notified());
        notified.as_mut().enable();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the TERMINATE (SIGTERM) handler.
///
/// Spawns a task that trips `shutdown` when the signal arrives. The handler
/// does the minimum possible: log, flip the flag, wake waiters - the accept
/// loop tears the listener down itself when it observes the flag.
///
/// # Errors
///
/// - `ServerError::Signal` if the OS rejects the handler registration
pub fn install_terminate_handler(shutdown: Shutdown) -> Result<(), ServerError> {
    let mut sigterm = signal(SignalKind::terminate()).map_err(ServerError::Signal)?;

    tokio::spawn(async move {
        if sigterm.recv().await.is_some() {
            tracing::info!("action: shutdown | result: in_progress | signal: SIGTERM");
            shutdown.trigger();
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn starts_untriggered() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());
    }

    #[tokio::test]
    async fn trigger_is_sticky_and_idempotent() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn notified_resolves_for_waiters_registered_before_trigger() {
        let shutdown = Shutdown::new();
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.notified().await })
        };

        // Give the waiter a chance to register before triggering.
        tokio::task::yield_now().await;
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .expect("waiter should not panic");
    }

    #[tokio::test]
    async fn notified_resolves_immediately_after_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), shutdown.notified())
            .await
            .expect("already-triggered handle should not block");
    }
}
