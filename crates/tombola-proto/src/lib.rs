//! Wire protocol for the tombola lottery draw service.
//!
//! Defines the six message kinds exchanged between betting agencies and the
//! draw server, and pure encode/decode for each. Every message starts with a
//! 1-byte type tag; strings travel as a 1-byte length followed by UTF-8
//! bytes, so no single field exceeds 255 bytes. Multi-byte integers are Big
//! Endian.
//!
//! ```text
//! client → server          server → client
//! 0 BetBatch               1 BatchConfirmation
//! 2 Finalization           4 NoWinnersYet
//! 3 GetWinners             5 Winners
//! ```
//!
//! The codec performs no I/O. Decoding works on a byte slice and reports
//! *incomplete* input (more bytes still in flight on a stream) separately
//! from malformed input, so a transport can fill a buffer and retry. See
//! [`ProtocolError::is_incomplete`].

mod codec;
mod errors;
mod message;

pub use errors::{ProtocolError, Result};
pub use message::{Bet, ClientMessage, MessageKind, ServerMessage};
