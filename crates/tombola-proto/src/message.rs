//! Message and record types carried by the wire protocol.

/// Message type tags, one byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    /// Batch of bets, client → server.
    BetBatch = 0,
    /// Accept/reject reply to a batch, server → client.
    BatchConfirmation = 1,
    /// Agency declares it has sent all its batches, client → server.
    Finalization = 2,
    /// Agency asks for its winners, client → server.
    GetWinners = 3,
    /// Draw has not happened yet, server → client (legacy polling reply).
    NoWinnersYet = 4,
    /// Winning documents for the asking agency, server → client.
    Winners = 5,
}

impl MessageKind {
    /// Parse a wire tag. `None` for tags outside the protocol.
    #[must_use]
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::BetBatch),
            1 => Some(Self::BatchConfirmation),
            2 => Some(Self::Finalization),
            3 => Some(Self::GetWinners),
            4 => Some(Self::NoWinnersYet),
            5 => Some(Self::Winners),
            _ => None,
        }
    }

    /// Wire tag for this kind.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// One lottery entry.
///
/// Immutable once constructed. The `agency` field is the client-declared
/// agency id; the server trusts it (there is no authentication on this
/// protocol). String fields travel length-prefixed with a single byte, so
/// each must stay within 255 UTF-8 bytes - the codec enforces this on
/// encode and it cannot be violated on decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bet {
    /// Agency the bet was placed through (≥ 1).
    pub agency: u32,
    /// Bettor's first name.
    pub first_name: String,
    /// Bettor's last name.
    pub last_name: String,
    /// National identity document, decimal digits.
    pub document: String,
    /// Birthdate as `YYYY-MM-DD`.
    pub birthdate: String,
    /// The number played, decimal digits.
    pub number: String,
}

/// Messages the server receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Zero or more bets submitted in one message.
    BetBatch(Vec<Bet>),
    /// The agency has sent its last batch.
    Finalization {
        /// Declaring agency.
        agency: u32,
    },
    /// The agency asks for its list of winners.
    GetWinners {
        /// Asking agency.
        agency: u32,
    },
}

impl ClientMessage {
    /// Wire kind of this message.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::BetBatch(_) => MessageKind::BetBatch,
            Self::Finalization { .. } => MessageKind::Finalization,
            Self::GetWinners { .. } => MessageKind::GetWinners,
        }
    }
}

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Reply to a [`ClientMessage::BetBatch`].
    BatchConfirmation {
        /// True when the whole batch was stored.
        accepted: bool,
    },
    /// Legacy polling reply: not every agency has finalized yet.
    NoWinnersYet,
    /// Winning documents for the asking agency, in store order.
    Winners(Vec<String>),
}

impl ServerMessage {
    /// Wire kind of this message.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::BatchConfirmation { .. } => MessageKind::BatchConfirmation,
            Self::NoWinnersYet => MessageKind::NoWinnersYet,
            Self::Winners(_) => MessageKind::Winners,
        }
    }
}
