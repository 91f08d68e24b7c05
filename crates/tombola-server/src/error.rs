//! Server error types.
//!
//! Two layers, matching who reacts to what:
//! - [`ServerError`]: fatal startup/supervisor failures. The process exits
//!   non-zero.
//! - [`SessionError`]: anything that ends one session. Confined to that
//!   session; the supervisor only learns "session done" and keeps joining
//!   the others.

use std::fmt;

use tombola_proto::{MessageKind, ProtocolError};

use crate::store::StoreError;

/// Fatal errors that prevent the server from running.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error (zero agencies, bad address, etc.).
    ///
    /// Fix configuration and restart.
    Config(String),

    /// Binding or listening on the TCP port failed.
    ///
    /// Usually the port is in use or privileged. Fatal before the accept
    /// loop starts.
    Bind(std::io::Error),

    /// Installing the termination-signal handler failed.
    ///
    /// Without it the server could not shut down gracefully, so startup is
    /// aborted instead.
    Signal(std::io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Bind(err) => write!(f, "failed to bind listener: {err}"),
            Self::Signal(err) => write!(f, "failed to install signal handler: {err}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(_) => None,
            Self::Bind(err) | Self::Signal(err) => Some(err),
        }
    }
}

/// Errors that end a single session.
#[derive(Debug)]
pub enum SessionError {
    /// The peer hung up.
    ///
    /// Covers both a clean close between messages and a close mid-frame.
    /// Logged; the session ends silently.
    ConnectionClosed,

    /// The peer sent bytes that do not form a valid message.
    ///
    /// Carries the message kind the peer appeared to be sending (from the
    /// tag byte) so the handler can reply with a batch failure when the
    /// offending message was a bet batch. The connection is closed.
    Protocol {
        /// Kind suggested by the tag byte, if that byte named one.
        kind: Option<MessageKind>,
        /// Underlying codec error.
        source: ProtocolError,
    },

    /// The bet store rejected a write or a scan.
    ///
    /// For a batch this is answered with a failure confirmation and the
    /// session continues; during the draw it ends the session.
    Store(StoreError),

    /// Not every agency reached the draw within the barrier timeout.
    ///
    /// A peer crashed or shut down mid-run. The session ends without
    /// sending a winners response, so this client goes unanswered.
    BarrierTimeout,

    /// Socket I/O failed outside of a clean close.
    Io(std::io::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionClosed => write!(f, "connection closed by peer"),
            Self::Protocol { kind: Some(kind), source } => {
                write!(f, "protocol error in {kind:?} message: {source}")
            },
            Self::Protocol { kind: None, source } => write!(f, "protocol error: {source}"),
            Self::Store(err) => write!(f, "store error: {err}"),
            Self::BarrierTimeout => write!(f, "draw barrier timed out"),
            Self::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Protocol { source, .. } => Some(source),
            Self::Store(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::ConnectionClosed | Self::BarrierTimeout => None,
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
