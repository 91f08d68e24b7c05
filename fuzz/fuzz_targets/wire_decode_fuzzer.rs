//! Fuzz target for wire message decoding
//!
//! Harden the codec against hostile agencies (a bet batch is fully
//! client-controlled input)
//!
//! # Strategy
//!
//! - Raw bytes: Completely arbitrary input through both decoders
//! - Tagged garbage: A valid tag followed by arbitrary bytes
//! - Huge counts: BetBatch headers claiming up to u32::MAX bets
//! - Truncation: Valid messages cut at an arbitrary point
//!
//! # Invariants
//!
//! - Decoding NEVER panics and never allocates from a claimed count
//! - A successful decode consumed no more bytes than were given
//! - A cut anywhere inside a valid message reports incomplete, not malformed
//! - Huge claimed counts end in an incomplete error, not memory exhaustion

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tombola_proto::{ClientMessage, ServerMessage};

#[derive(Debug, Clone, Arbitrary)]
enum DecodeInput {
    RawBytes(Vec<u8>),
    TaggedGarbage { tag: u8, body: Vec<u8> },
    HugeBatchCount { count: u32, body: Vec<u8> },
    TruncatedFinalization { agency: u32, cut: usize },
}

fuzz_target!(|input: DecodeInput| {
    let bytes = match input {
        DecodeInput::RawBytes(bytes) => bytes,
        DecodeInput::TaggedGarbage { tag, body } => {
            let mut bytes = vec![tag % 8];
            bytes.extend_from_slice(&body);
            bytes
        },
        DecodeInput::HugeBatchCount { count, body } => {
            let mut bytes = vec![0u8];
            bytes.extend_from_slice(&count.to_be_bytes());
            bytes.extend_from_slice(&body);
            bytes
        },
        DecodeInput::TruncatedFinalization { agency, cut } => {
            let mut bytes = Vec::new();
            ClientMessage::Finalization { agency: agency.max(1) }
                .encode(&mut bytes)
                .expect("agency ids always encode");

            let cut = cut % bytes.len();
            bytes.truncate(cut);

            // A strict prefix must read as incomplete.
            let err = ClientMessage::decode(&bytes).expect_err("prefix must not decode");
            assert!(err.is_incomplete(), "cut at {cut}: {err:?}");
            return;
        },
    };

    if let Ok((_, consumed)) = ClientMessage::decode(&bytes) {
        assert!(consumed <= bytes.len());
    }

    if let Ok((_, consumed)) = ServerMessage::decode(&bytes) {
        assert!(consumed <= bytes.len());
    }
});
