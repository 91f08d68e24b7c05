//! Server configuration.

use std::time::Duration;

/// Default OS listen queue depth.
pub const DEFAULT_LISTEN_BACKLOG: u32 = 5;

/// Default bound on the draw-barrier wait.
pub const DEFAULT_BARRIER_TIMEOUT: Duration = Duration::from_secs(2);

/// Default accept timeout, so the accept loop re-checks the shutdown flag.
pub const DEFAULT_ACCEPT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default winning number for the draw.
pub const DEFAULT_WINNING_NUMBER: u32 = 7574;

/// Server configuration.
///
/// `number_of_clients` is the configured agency count: the supervisor accepts
/// exactly that many connections and the draw barrier releases when that many
/// sessions have asked for winners.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on. Port 0 lets the OS pick (used by tests).
    pub port: u16,
    /// OS listen queue depth.
    pub listen_backlog: u32,
    /// Expected agency count, ≥ 1.
    pub number_of_clients: usize,
    /// Bound on the draw-barrier wait before giving up on absent peers.
    pub barrier_timeout: Duration,
    /// Accept timeout; bounds how long a shutdown can go unnoticed.
    pub accept_poll_interval: Duration,
    /// The number a bet must carry to win the draw.
    pub winning_number: u32,
    /// Answer early winner requests with `NoWinnersYet` instead of holding
    /// the session at the barrier (legacy client compatibility).
    pub polling_fallback: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 12345,
            listen_backlog: DEFAULT_LISTEN_BACKLOG,
            number_of_clients: 1,
            barrier_timeout: DEFAULT_BARRIER_TIMEOUT,
            accept_poll_interval: DEFAULT_ACCEPT_POLL_INTERVAL,
            winning_number: DEFAULT_WINNING_NUMBER,
            polling_fallback: false,
        }
    }
}
