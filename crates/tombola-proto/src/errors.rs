//! Protocol error types.

use thiserror::Error;

use crate::message::MessageKind;

/// Convenience alias for codec results.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced by the wire codec.
///
/// Two variants describe input that ran out rather than input that is wrong:
/// [`ProtocolError::Truncated`] (a fixed-width piece was cut short) and
/// [`ProtocolError::FieldOverrun`] (a length prefix claims more bytes than
/// the slice holds). On a live stream both simply mean "read more", which is
/// what [`ProtocolError::is_incomplete`] reports; on a closed stream or a
/// complete slice they are real framing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The type tag does not name any known message kind.
    #[error("unknown message tag: {0}")]
    UnknownTag(u8),

    /// The tag names a message kind that does not travel in this direction.
    #[error("unexpected message kind {0:?} for this direction")]
    UnexpectedKind(MessageKind),

    /// A fixed-width piece (tag, count, length prefix) was cut short.
    #[error("truncated input: needed {expected} bytes, found {actual}")]
    Truncated {
        /// Total bytes the decoder needed up to this point.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// A length prefix exceeds the remaining readable bytes.
    #[error("length prefix {declared} exceeds remaining input of {available} bytes")]
    FieldOverrun {
        /// Length the prefix declared.
        declared: usize,
        /// Bytes left after the prefix.
        available: usize,
    },

    /// A string field is not valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// An agency id field did not parse as a positive decimal integer.
    #[error("invalid agency id: {0:?}")]
    InvalidAgency(String),

    /// A batch confirmation carried a status byte other than 0 or 1.
    #[error("invalid confirmation status: {0}")]
    InvalidStatus(u8),

    /// A winners list cannot be represented on the wire (u8 count).
    ///
    /// The codec fails fast here rather than silently truncating the list.
    #[error("winners list has {0} entries, wire limit is 255")]
    TooManyWinners(usize),

    /// A string field cannot be represented on the wire (u8 length prefix).
    #[error("field `{field}` is {len} bytes, wire limit is 255")]
    FieldTooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Its UTF-8 byte length.
        len: usize,
    },
}

impl ProtocolError {
    /// True when the input merely ended early.
    ///
    /// A streaming caller should read more bytes and retry the decode; every
    /// other variant is a hard framing error that no amount of further input
    /// can repair.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Truncated { .. } | Self::FieldOverrun { .. })
    }
}
