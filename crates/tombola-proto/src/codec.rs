//! Pure encode/decode for the wire messages.
//!
//! Layout on the wire, per message:
//!
//! ```text
//! BetBatch          [tag 0][count: u32 BE][count × Bet]
//! BatchConfirmation [tag 1][status: u8, 0 fail / 1 ok]
//! Finalization      [tag 2][agency: str]
//! GetWinners        [tag 3][agency: str]
//! NoWinnersYet      [tag 4]
//! Winners           [tag 5][count: u8][count × document: str]
//! ```
//!
//! where `str` is `[len: u8][len × UTF-8 byte]` and a Bet is its six fields
//! as `str`, in order: agency (decimal), first_name, last_name, document,
//! birthdate, number.
//!
//! Decoding consumes a prefix of the given slice and reports how many bytes
//! it used, so callers can run it against a growing receive buffer. Nothing
//! here reads or writes a socket.

use bytes::BufMut;

use crate::{
    errors::{ProtocolError, Result},
    message::{Bet, ClientMessage, MessageKind, ServerMessage},
};

/// Cursor over a byte slice, tracking how much a decode consumed.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Next `n` bytes, or `Truncated` if the slice ends first.
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos + n;
        if end > self.buf.len() {
            return Err(ProtocolError::Truncated { expected: end, actual: self.buf.len() });
        }
        let piece = &self.buf[self.pos..end];
        self.pos = end;
        Ok(piece)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32_be(&mut self) -> Result<u32> {
        let raw = self.take(4)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    /// One length-prefixed UTF-8 string.
    fn str_field(&mut self) -> Result<String> {
        let len = usize::from(self.u8()?);
        let available = self.buf.len() - self.pos;
        if len > available {
            return Err(ProtocolError::FieldOverrun { declared: len, available });
        }
        let raw = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        let value = std::str::from_utf8(raw).map_err(|_| ProtocolError::InvalidUtf8)?;
        Ok(value.to_owned())
    }

    /// An agency id: a length-prefixed string of decimal digits, ≥ 1.
    fn agency_field(&mut self) -> Result<u32> {
        let raw = self.str_field()?;
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProtocolError::InvalidAgency(raw));
        }
        match raw.parse::<u32>() {
            Ok(id) if id >= 1 => Ok(id),
            _ => Err(ProtocolError::InvalidAgency(raw)),
        }
    }
}

/// Write one length-prefixed string field.
fn put_field(dst: &mut impl BufMut, field: &'static str, value: &str) -> Result<()> {
    let len = value.len();
    if len > usize::from(u8::MAX) {
        return Err(ProtocolError::FieldTooLong { field, len });
    }
    dst.put_u8(len as u8);
    dst.put_slice(value.as_bytes());
    Ok(())
}

impl Bet {
    /// Encode the six fields in wire order.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FieldTooLong` if any field exceeds 255 UTF-8 bytes
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        put_field(dst, "agency", &self.agency.to_string())?;
        put_field(dst, "first_name", &self.first_name)?;
        put_field(dst, "last_name", &self.last_name)?;
        put_field(dst, "document", &self.document)?;
        put_field(dst, "birthdate", &self.birthdate)?;
        put_field(dst, "number", &self.number)?;
        Ok(())
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            agency: r.agency_field()?,
            first_name: r.str_field()?,
            last_name: r.str_field()?,
            document: r.str_field()?,
            birthdate: r.str_field()?,
            number: r.str_field()?,
        })
    }
}

impl ClientMessage {
    /// Encode into `dst`, tag first.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FieldTooLong` if a bet field exceeds 255 bytes
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        dst.put_u8(self.kind().to_u8());
        match self {
            Self::BetBatch(bets) => {
                debug_assert!(bets.len() <= u32::MAX as usize);
                dst.put_u32(bets.len() as u32);
                for bet in bets {
                    bet.encode(dst)?;
                }
            },
            Self::Finalization { agency } | Self::GetWinners { agency } => {
                put_field(dst, "agency", &agency.to_string())?;
            },
        }
        Ok(())
    }

    /// Decode one message from the front of `src`.
    ///
    /// Returns the message and the number of bytes consumed; bytes past the
    /// message are left untouched for the next decode.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownTag` for tags outside the protocol
    /// - `ProtocolError::UnexpectedKind` for server→client tags
    /// - `ProtocolError::Truncated` / `FieldOverrun` when `src` ends mid-message
    ///   (retry with more bytes, see [`ProtocolError::is_incomplete`])
    /// - `ProtocolError::InvalidUtf8` / `InvalidAgency` for malformed fields
    pub fn decode(src: &[u8]) -> Result<(Self, usize)> {
        let mut r = Reader::new(src);
        let tag = r.u8()?;
        let kind = MessageKind::from_u8(tag).ok_or(ProtocolError::UnknownTag(tag))?;

        let msg = match kind {
            MessageKind::BetBatch => {
                let count = r.u32_be()? as usize;

                // The count is client-controlled; sizing the Vec up front
                // would let a 5-byte message reserve gigabytes.
                let mut bets = Vec::new();
                for _ in 0..count {
                    bets.push(Bet::decode(&mut r)?);
                }
                Self::BetBatch(bets)
            },
            MessageKind::Finalization => Self::Finalization { agency: r.agency_field()? },
            MessageKind::GetWinners => Self::GetWinners { agency: r.agency_field()? },
            other => return Err(ProtocolError::UnexpectedKind(other)),
        };

        Ok((msg, r.pos))
    }
}

impl ServerMessage {
    /// Encode into `dst`, tag first.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::TooManyWinners` if a winners list exceeds 255
    ///   entries (the u8 count cannot carry more; nothing is truncated)
    /// - `ProtocolError::FieldTooLong` if a document exceeds 255 bytes
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        dst.put_u8(self.kind().to_u8());
        match self {
            Self::BatchConfirmation { accepted } => dst.put_u8(u8::from(*accepted)),
            Self::NoWinnersYet => {},
            Self::Winners(documents) => {
                if documents.len() > usize::from(u8::MAX) {
                    return Err(ProtocolError::TooManyWinners(documents.len()));
                }
                dst.put_u8(documents.len() as u8);
                for document in documents {
                    put_field(dst, "document", document)?;
                }
            },
        }
        Ok(())
    }

    /// Decode one message from the front of `src`.
    ///
    /// Same contract as [`ClientMessage::decode`], for the server→client
    /// direction.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownTag` / `UnexpectedKind` for foreign tags
    /// - `ProtocolError::InvalidStatus` for confirmation bytes other than 0/1
    /// - `ProtocolError::Truncated` / `FieldOverrun` when `src` ends mid-message
    /// - `ProtocolError::InvalidUtf8` for malformed documents
    pub fn decode(src: &[u8]) -> Result<(Self, usize)> {
        let mut r = Reader::new(src);
        let tag = r.u8()?;
        let kind = MessageKind::from_u8(tag).ok_or(ProtocolError::UnknownTag(tag))?;

        let msg = match kind {
            MessageKind::BatchConfirmation => {
                let accepted = match r.u8()? {
                    0 => false,
                    1 => true,
                    other => return Err(ProtocolError::InvalidStatus(other)),
                };
                Self::BatchConfirmation { accepted }
            },
            MessageKind::NoWinnersYet => Self::NoWinnersYet,
            MessageKind::Winners => {
                let count = usize::from(r.u8()?);
                let mut documents = Vec::with_capacity(count);
                for _ in 0..count {
                    documents.push(r.str_field()?);
                }
                Self::Winners(documents)
            },
            other => return Err(ProtocolError::UnexpectedKind(other)),
        };

        Ok((msg, r.pos))
    }
}
