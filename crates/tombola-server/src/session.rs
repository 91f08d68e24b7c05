//! Per-client session handler.
//!
//! One session drives one agency's connection through the protocol. The
//! lifecycle is an explicit state machine:
//!
//! ```text
//! ┌─────────┐  GetWinners + barrier release   ┌───────┐
//! │ Running │────────────────────────────────>│ Drawn │
//! └─────────┘                                 └───────┘
//!      │
//!      │ shutdown / peer hangup / protocol error / barrier timeout
//!      ↓
//! ┌─────────┐
//! │ Closed  │
//! └─────────┘
//! ```
//!
//! The session loops in Running, handling one message per iteration. Its
//! only coordination with peers goes through three shared primitives: the
//! bet ledger (file lock), the draw barrier, and the shutdown handle - the
//! supervisor never talks to a running session directly.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use tombola_proto::{Bet, ClientMessage, MessageKind};

use crate::{
    barrier::DrawBarrier,
    error::SessionError,
    shutdown::Shutdown,
    store::{BetLedger, BetStore},
    transport::Transport,
};

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Reading and handling messages.
    Running,
    /// Winners sent; the session is done and the connection closes.
    Drawn,
    /// Ended without a draw: shutdown, hangup, error, or barrier timeout.
    Closed,
}

/// Cross-session draw bookkeeping.
///
/// Counts agencies that have finalized (each session counts at most once)
/// and remembers whether the draw completion has been announced, so the
/// `sorteo` log line appears exactly once per run no matter which session
/// gets there first.
#[derive(Debug)]
pub struct DrawProgress {
    expected: usize,
    finalized: AtomicUsize,
    announced: AtomicBool,
}

impl DrawProgress {
    /// Bookkeeping for `expected` agencies.
    #[must_use]
    pub fn new(expected: usize) -> Self {
        Self { expected, finalized: AtomicUsize::new(0), announced: AtomicBool::new(false) }
    }

    /// Agencies that have finalized so far.
    #[must_use]
    pub fn finalized(&self) -> usize {
        self.finalized.load(Ordering::SeqCst)
    }

    fn mark_finalized(&self) -> usize {
        self.finalized.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn all_finalized(&self) -> bool {
        self.finalized() >= self.expected
    }

    /// True exactly once, for whichever session announces the draw.
    fn announce_draw(&self) -> bool {
        !self.announced.swap(true, Ordering::SeqCst)
    }
}

/// Shared state a session needs; cloned from the supervisor per session.
#[derive(Debug)]
pub struct SessionContext<S> {
    /// Serialized bet store.
    pub ledger: BetLedger<S>,
    /// Draw rendezvous.
    pub barrier: Arc<DrawBarrier>,
    /// Shutdown flag + wakeup.
    pub shutdown: Shutdown,
    /// Finalization count and the one-shot draw announcement.
    pub progress: Arc<DrawProgress>,
    /// Answer early winner requests with `NoWinnersYet` instead of holding
    /// the session at the barrier.
    pub polling_fallback: bool,
}

impl<S> Clone for SessionContext<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            barrier: Arc::clone(&self.barrier),
            shutdown: self.shutdown.clone(),
            progress: Arc::clone(&self.progress),
            polling_fallback: self.polling_fallback,
        }
    }
}

/// State machine for one agency connection.
#[derive(Debug)]
pub struct Session<S: BetStore> {
    transport: Transport,
    ctx: SessionContext<S>,
    /// Unknown until the first Finalization or GetWinners names it.
    agency: Option<u32>,
    finalized: bool,
    state: SessionState,
}

impl<S: BetStore> Session<S> {
    /// Session over an accepted connection.
    pub fn new(transport: Transport, ctx: SessionContext<S>) -> Self {
        Self { transport, ctx, agency: None, finalized: false, state: SessionState::Running }
    }

    /// Drive the session to completion.
    ///
    /// Consumes the session; the socket closes when it returns. Errors are
    /// confined to this session - the supervisor only logs them.
    ///
    /// # Errors
    ///
    /// - any [`SessionError`]; see its variants for what ends a session
    pub async fn run(mut self) -> Result<SessionState, SessionError> {
        match self.drive().await {
            Ok(()) => Ok(self.state),
            Err(err) => {
                self.state = SessionState::Closed;
                Err(err)
            },
        }
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        while self.state == SessionState::Running {
            if self.ctx.shutdown.is_triggered() {
                // Exit without replying; the client sees the close.
                self.state = SessionState::Closed;
                return Ok(());
            }

            let received = tokio::select! {
                () = self.ctx.shutdown.notified() => None,
                received = self.transport.recv_message() => Some(received),
            };

            let Some(received) = received else {
                // Shutdown while waiting for the peer.
                self.state = SessionState::Closed;
                return Ok(());
            };
            let message = self.check_received(received).await?;

            match message {
                ClientMessage::BetBatch(bets) => self.handle_batch(&bets).await?,
                ClientMessage::Finalization { agency } => self.handle_finalization(agency),
                ClientMessage::GetWinners { agency } => self.handle_get_winners(agency).await?,
            }
        }

        Ok(())
    }

    /// Triage a receive result before it reaches the dispatch.
    async fn check_received(
        &mut self,
        received: Result<ClientMessage, SessionError>,
    ) -> Result<ClientMessage, SessionError> {
        match received {
            Ok(message) => Ok(message),
            Err(SessionError::Protocol { kind, source }) => {
                tracing::warn!(
                    "action: receive_message | result: fail | ip: {} | error: {}",
                    self.transport.peer_addr().ip(),
                    source
                );

                // Only a broken bet batch earns a reply; anything else is
                // dropped. Best effort - the peer may already be gone.
                if kind == Some(MessageKind::BetBatch) {
                    let _ = self.transport.send_batch_failure().await;
                }

                Err(SessionError::Protocol { kind, source })
            },
            Err(err) => Err(err),
        }
    }

    async fn handle_batch(&mut self, bets: &[Bet]) -> Result<(), SessionError> {
        match self.ctx.ledger.store(bets).await {
            Ok(()) => {
                tracing::info!("action: apuesta_recibida | result: success | cantidad: {}", bets.len());
                self.transport.send_batch_success().await
            },
            Err(err) => {
                // The client may retry; the session keeps running.
                tracing::error!(
                    "action: apuesta_recibida | result: fail | cantidad: {} | error: {}",
                    bets.len(),
                    err
                );
                self.transport.send_batch_failure().await
            },
        }
    }

    fn handle_finalization(&mut self, agency: u32) {
        self.bind_agency(agency);
        self.mark_finalized();
    }

    async fn handle_get_winners(&mut self, agency: u32) -> Result<(), SessionError> {
        self.bind_agency(agency);

        if self.ctx.polling_fallback {
            return self.poll_winners(agency).await;
        }

        // Asking for winners is an implicit finalization: the protocol puts
        // GetWinners after the agency's last batch.
        self.mark_finalized();

        // A shutdown must not leave this session parked until the barrier
        // expires, so the wait races the notifier.
        let outcome = tokio::select! {
            () = self.ctx.shutdown.notified() => None,
            outcome = self.ctx.barrier.wait() => Some(outcome),
        };

        match outcome {
            None => {
                self.state = SessionState::Closed;
                Ok(())
            },
            Some(Err(_)) => {
                tracing::warn!(
                    "action: sorteo | result: fail | ip: {} | error: a peer never reached the draw",
                    self.transport.peer_addr().ip()
                );
                Err(SessionError::BarrierTimeout)
            },
            Some(Ok(())) => self.send_draw_results(agency).await,
        }
    }

    /// Legacy polling path: no implicit finalization, the client retries
    /// until every agency has finalized.
    async fn poll_winners(&mut self, agency: u32) -> Result<(), SessionError> {
        if self.ctx.progress.all_finalized() {
            self.send_draw_results(agency).await
        } else {
            self.transport.send_no_winners_yet().await
        }
    }

    /// Fresh draw for this agency, then the winners reply.
    async fn send_draw_results(&mut self, agency: u32) -> Result<(), SessionError> {
        let winners = self.ctx.ledger.draw_winners_for(agency).await?;

        if self.ctx.progress.announce_draw() {
            tracing::info!("action: sorteo | result: success");
        }

        self.transport.send_winners(&winners).await?;
        tracing::info!(
            "action: ganadores_enviados | result: success | agencia: {} | cantidad: {}",
            agency,
            winners.len()
        );

        self.state = SessionState::Drawn;
        Ok(())
    }

    /// First Finalization or GetWinners fixes the session's agency;
    /// a different id later is ignored, keeping the binding consistent.
    fn bind_agency(&mut self, agency: u32) {
        match self.agency {
            None => self.agency = Some(agency),
            Some(bound) if bound != agency => {
                tracing::warn!(
                    "action: receive_message | result: fail | ip: {} | error: agency {} does not match session agency {}",
                    self.transport.peer_addr().ip(),
                    agency,
                    bound
                );
            },
            Some(_) => {},
        }
    }

    /// Count this session's agency as finalized, once; extra finalizations
    /// are accepted and ignored.
    fn mark_finalized(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        let done = self.ctx.progress.mark_finalized();
        tracing::debug!(
            "action: finalizacion | result: success | agencias: {}/{}",
            done,
            self.ctx.barrier.parties()
        );
    }
}
