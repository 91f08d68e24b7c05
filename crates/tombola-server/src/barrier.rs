//! N-party draw barrier with a bounded wait.
//!
//! Every session arriving at its winners request waits here; the last
//! arrival releases them all at once. The wait is bounded: if a peer never
//! arrives (crashed, or shut down mid-run), the remaining waiters wake with
//! [`BarrierTimeoutError`] instead of deadlocking, and their clients go
//! unanswered for this run.
//!
//! Arrivals are counted inside a `watch` channel, so waiting is just
//! observing the count reach the party size - no polling, and a session that
//! times out does not disturb the count for late arrivals.

use std::{fmt, time::Duration};

use tokio::sync::watch;

/// The barrier wait expired before all parties arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierTimeoutError;

impl fmt::Display for BarrierTimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "draw barrier timed out before all agencies arrived")
    }
}

impl std::error::Error for BarrierTimeoutError {}

/// An N-party rendezvous used once per run.
///
/// Unlike a reusable cyclic barrier, arrivals are permanent: once the count
/// reaches the party size every current and future `wait` returns
/// immediately. That matches the draw - after all agencies have asked for
/// winners, the draw is open for good.
#[derive(Debug)]
pub struct DrawBarrier {
    parties: usize,
    wait_timeout: Duration,
    arrivals: watch::Sender<usize>,
}

impl DrawBarrier {
    /// Create a barrier for `parties` sessions (≥ 1) and a bounded wait.
    #[must_use]
    pub fn new(parties: usize, wait_timeout: Duration) -> Self {
        debug_assert!(parties >= 1);
        let (arrivals, _) = watch::channel(0);
        Self { parties, wait_timeout, arrivals }
    }

    /// Number of parties the barrier waits for.
    #[must_use]
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Sessions that have arrived so far.
    #[must_use]
    pub fn arrived(&self) -> usize {
        *self.arrivals.borrow()
    }

    /// Arrive and wait for the rest.
    ///
    /// Returns as soon as `parties` sessions have arrived in total; with a
    /// single party this returns immediately. A timed-out waiter still
    /// counts as arrived, so stragglers behind it can be released.
    ///
    /// # Errors
    ///
    /// - [`BarrierTimeoutError`] if the configured wait expires first
    pub async fn wait(&self) -> Result<(), BarrierTimeoutError> {
        // Subscribe before bumping the count so this waiter cannot miss the
        // release when it is itself the last arrival.
        let mut rx = self.arrivals.subscribe();
        self.arrivals.send_modify(|count| *count += 1);

        let released = tokio::time::timeout(self.wait_timeout, async {
            while *rx.borrow_and_update() < self.parties {
                if rx.changed().await.is_err() {
                    // Barrier dropped while waiting; cannot release anymore.
                    break;
                }
            }
            *rx.borrow() >= self.parties
        })
        .await;

        match released {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(BarrierTimeoutError),
        }
    }
}
