//! Server supervisor.
//!
//! Binds the listener, accepts exactly the configured number of agency
//! connections, spawns one session task per connection, and joins them all
//! before exiting. The supervisor is the sole owner of the shared
//! coordination state (shutdown handle, bet ledger, draw barrier); sessions
//! get clones and nothing else - there is no supervisor↔session channel.
//!
//! Accepts are bounded by `accept_poll_interval` and raced against the
//! shutdown notifier, so a TERMINATE observed mid-accept stops the loop
//! promptly; the listening socket is dropped the moment no further
//! connection will be accepted.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

use tokio::{
    net::{TcpListener, TcpSocket},
    task::JoinSet,
    time::timeout,
};

use crate::{
    barrier::DrawBarrier,
    config::ServerConfig,
    error::ServerError,
    session::{DrawProgress, Session, SessionContext},
    shutdown::{Shutdown, install_terminate_handler},
    store::{BetLedger, BetStore},
    transport::Transport,
};

/// The long-running server process.
#[derive(Debug)]
pub struct Server<S: BetStore> {
    listener: TcpListener,
    config: ServerConfig,
    ctx: SessionContext<S>,
}

impl<S: BetStore> Server<S> {
    /// Validate the configuration and bind the listening socket.
    ///
    /// Must run inside a tokio runtime. Failures here are fatal: the caller
    /// exits non-zero before any session starts.
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` if `number_of_clients` is zero
    /// - `ServerError::Bind` if the socket cannot be bound or listened on
    pub fn bind(config: ServerConfig, store: S) -> Result<Self, ServerError> {
        if config.number_of_clients == 0 {
            return Err(ServerError::Config("number_of_clients must be at least 1".to_owned()));
        }

        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.port);
        let socket = TcpSocket::new_v4().map_err(ServerError::Bind)?;
        socket.set_reuseaddr(true).map_err(ServerError::Bind)?;
        socket.bind(addr).map_err(ServerError::Bind)?;
        let listener = socket.listen(config.listen_backlog).map_err(ServerError::Bind)?;

        let ctx = SessionContext {
            ledger: BetLedger::new(store, config.winning_number),
            barrier: Arc::new(DrawBarrier::new(config.number_of_clients, config.barrier_timeout)),
            shutdown: Shutdown::new(),
            progress: Arc::new(DrawProgress::new(config.number_of_clients)),
            polling_fallback: config.polling_fallback,
        };

        Ok(Self { listener, config, ctx })
    }

    /// Address the listener is bound to; lets tests bind port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(ServerError::Bind)
    }

    /// Handle that trips the same shutdown the SIGTERM handler trips.
    #[must_use]
    pub fn shutdown_handle(&self) -> Shutdown {
        self.ctx.shutdown.clone()
    }

    /// Run to completion: serve every configured agency or shut down.
    ///
    /// Returns `Ok` both on a full run (all agencies served) and on a
    /// graceful shutdown; session failures are logged, never propagated.
    ///
    /// # Errors
    ///
    /// - `ServerError::Signal` if the TERMINATE handler cannot be installed
    pub async fn run(self) -> Result<(), ServerError> {
        install_terminate_handler(self.ctx.shutdown.clone())?;

        let mut sessions = JoinSet::new();
        let mut accepted = 0usize;

        while accepted < self.config.number_of_clients {
            if self.ctx.shutdown.is_triggered() {
                break;
            }

            tracing::info!("action: accept_connections | result: in_progress");

            let outcome = tokio::select! {
                () = self.ctx.shutdown.notified() => None,
                outcome = timeout(self.config.accept_poll_interval, self.listener.accept()) => {
                    Some(outcome)
                },
            };

            let Some(outcome) = outcome else { break };
            match outcome {
                // Accept timed out; loop around and re-check the flag.
                Err(_elapsed) => {},
                Ok(Ok((stream, peer))) => {
                    tracing::info!("action: accept_connections | result: success | ip: {}", peer.ip());
                    accepted += 1;

                    let session = Session::new(Transport::new(stream, peer), self.ctx.clone());
                    sessions.spawn(session.run());
                },
                Ok(Err(err)) => {
                    // One failed accept does not take the server down.
                    tracing::error!("action: accept_connections | result: fail | error: {}", err);
                },
            }
        }

        // No further connection will be accepted; close the listening
        // socket before waiting on the sessions.
        drop(self.listener);

        while let Some(joined) = sessions.join_next().await {
            match joined {
                Ok(Ok(state)) => {
                    tracing::debug!("action: session_closed | result: success | state: {state:?}");
                },
                Ok(Err(err)) => {
                    tracing::warn!("action: session_closed | result: fail | error: {err}");
                },
                Err(err) => {
                    tracing::error!("action: session_closed | result: fail | error: {err}");
                },
            }
        }

        tracing::info!("action: shutdown | result: success");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "test code")]

    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn bind_rejects_zero_agencies() {
        let config = ServerConfig { port: 0, number_of_clients: 0, ..ServerConfig::default() };
        let result = Server::bind(config, MemoryStore::new());
        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn bind_on_port_zero_assigns_a_port() {
        let config = ServerConfig { port: 0, ..ServerConfig::default() };
        let server = Server::bind(config, MemoryStore::new()).expect("bind");
        assert_ne!(server.local_addr().expect("local addr").port(), 0);
    }

    #[tokio::test]
    async fn shutdown_before_any_connection_ends_the_run() {
        let config = ServerConfig { port: 0, number_of_clients: 3, ..ServerConfig::default() };
        let server = Server::bind(config, MemoryStore::new()).expect("bind");

        let shutdown = server.shutdown_handle();
        shutdown.trigger();

        tokio::time::timeout(std::time::Duration::from_secs(1), server.run())
            .await
            .expect("run should return promptly")
            .expect("graceful shutdown is not an error");
    }
}
