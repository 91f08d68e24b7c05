//! Fuzz target for encode/decode round-trips
//!
//! # Strategy
//!
//! - Structured messages: Arbitrary-derived bets, batches, agency ids and
//!   winners lists, sanitized just enough to be encodable (agency ≥ 1)
//!
//! # Invariants
//!
//! - Whatever encodes, decodes back to the same value
//! - Decode consumes exactly the bytes encode produced
//! - Oversized fields fail encoding with an error, never a panic

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tombola_proto::{Bet, ClientMessage, ServerMessage};

#[derive(Debug, Clone, Arbitrary)]
struct FuzzBet {
    agency: u32,
    first_name: String,
    last_name: String,
    document: String,
    birthdate: String,
    number: String,
}

impl From<FuzzBet> for Bet {
    fn from(bet: FuzzBet) -> Self {
        Self {
            agency: bet.agency.max(1),
            first_name: bet.first_name,
            last_name: bet.last_name,
            document: bet.document,
            birthdate: bet.birthdate,
            number: bet.number,
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
enum Scenario {
    Batch(Vec<FuzzBet>),
    Finalization(u32),
    GetWinners(u32),
    Confirmation(bool),
    NoWinnersYet,
    Winners(Vec<String>),
}

fuzz_target!(|scenario: Scenario| {
    match scenario {
        Scenario::Batch(bets) => {
            let message = ClientMessage::BetBatch(bets.into_iter().map(Bet::from).collect());
            client_roundtrip(&message);
        },
        Scenario::Finalization(agency) => {
            client_roundtrip(&ClientMessage::Finalization { agency: agency.max(1) });
        },
        Scenario::GetWinners(agency) => {
            client_roundtrip(&ClientMessage::GetWinners { agency: agency.max(1) });
        },
        Scenario::Confirmation(accepted) => {
            server_roundtrip(&ServerMessage::BatchConfirmation { accepted });
        },
        Scenario::NoWinnersYet => server_roundtrip(&ServerMessage::NoWinnersYet),
        Scenario::Winners(documents) => server_roundtrip(&ServerMessage::Winners(documents)),
    }
});

fn client_roundtrip(message: &ClientMessage) {
    let mut wire = Vec::new();
    if message.encode(&mut wire).is_err() {
        // Oversized field; rejection is the correct outcome.
        return;
    }

    let (decoded, consumed) = ClientMessage::decode(&wire).expect("encoded message must decode");
    assert_eq!(&decoded, message);
    assert_eq!(consumed, wire.len());
}

fn server_roundtrip(message: &ServerMessage) {
    let mut wire = Vec::new();
    if message.encode(&mut wire).is_err() {
        return;
    }

    let (decoded, consumed) = ServerMessage::decode(&wire).expect("encoded message must decode");
    assert_eq!(&decoded, message);
    assert_eq!(consumed, wire.len());
}
