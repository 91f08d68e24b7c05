//! Tombola lottery draw server.
//!
//! A fixed number of betting agencies connect over TCP, stream batches of
//! bets, declare themselves done, and ask for their winners. The draw is
//! gated by an N-party barrier: no winners response is sent until every
//! agency has asked, which in turn means every bet is already in the store.
//!
//! # Components
//!
//! - [`Server`]: supervisor - binds, accepts exactly N connections, owns
//!   the shared coordination state, joins every session before exiting
//! - [`Session`]: per-connection protocol state machine
//!   (`Running → Drawn → Closed`)
//! - [`Transport`]: buffered framing over one `TcpStream`
//! - [`store`]: bet persistence and the serialized [`store::BetLedger`]
//!   facade that every session writes through
//! - [`DrawBarrier`]: bounded-wait rendezvous that gates the draw
//! - [`Shutdown`]: SIGTERM flag + wakeup shared by supervisor and sessions

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod barrier;
mod config;
mod error;
mod session;
mod shutdown;
mod supervisor;
pub mod store;
mod transport;

pub use barrier::{BarrierTimeoutError, DrawBarrier};
pub use config::{
    DEFAULT_ACCEPT_POLL_INTERVAL, DEFAULT_BARRIER_TIMEOUT, DEFAULT_LISTEN_BACKLOG,
    DEFAULT_WINNING_NUMBER, ServerConfig,
};
pub use error::{ServerError, SessionError};
pub use session::{DrawProgress, Session, SessionContext, SessionState};
pub use shutdown::{Shutdown, install_terminate_handler};
pub use supervisor::Server;
pub use transport::Transport;
