//! Property-based tests for the wire codec.
//!
//! These verify the round-trip laws and the streaming contract for ALL valid
//! inputs, not just specific examples: any encoded message decodes back to
//! itself, and any strict prefix of a single message reports *incomplete*
//! rather than succeeding or misfiring as malformed.

use proptest::prelude::*;
use tombola_proto::{Bet, ClientMessage, ServerMessage};

/// Strategy for one wire string field: at most 40 chars, so the UTF-8 form
/// stays well under the 255-byte prefix limit.
fn arbitrary_field() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<char>(), 0..40)
        .prop_map(|chars| chars.into_iter().collect::<String>())
}

/// Strategy for a decimal-digit field (documents, played numbers).
fn arbitrary_digits() -> impl Strategy<Value = String> {
    prop::collection::vec(0u8..10, 1..9)
        .prop_map(|digits| digits.into_iter().map(|d| char::from(b'0' + d)).collect())
}

/// Strategy for generating arbitrary bets.
fn arbitrary_bet() -> impl Strategy<Value = Bet> {
    (
        1u32..100_000,
        arbitrary_field(),
        arbitrary_field(),
        arbitrary_digits(),
        arbitrary_digits(),
        arbitrary_digits(),
    )
        .prop_map(|(agency, first_name, last_name, document, birthdate, number)| Bet {
            agency,
            first_name,
            last_name,
            document,
            birthdate,
            number,
        })
}

/// Strategy for generating arbitrary client messages.
fn arbitrary_client_message() -> impl Strategy<Value = ClientMessage> {
    prop_oneof![
        prop::collection::vec(arbitrary_bet(), 0..8).prop_map(ClientMessage::BetBatch),
        (1u32..100_000).prop_map(|agency| ClientMessage::Finalization { agency }),
        (1u32..100_000).prop_map(|agency| ClientMessage::GetWinners { agency }),
    ]
}

/// Strategy for generating arbitrary server messages.
fn arbitrary_server_message() -> impl Strategy<Value = ServerMessage> {
    prop_oneof![
        any::<bool>().prop_map(|accepted| ServerMessage::BatchConfirmation { accepted }),
        Just(ServerMessage::NoWinnersYet),
        prop::collection::vec(arbitrary_digits(), 0..32).prop_map(ServerMessage::Winners),
    ]
}

#[test]
fn prop_client_message_roundtrip() {
    proptest!(|(message in arbitrary_client_message())| {
        let mut wire = Vec::new();
        message.encode(&mut wire).expect("encode should succeed");

        let (decoded, consumed) = ClientMessage::decode(&wire).expect("decode should succeed");

        // PROPERTY: Round-trip must be identity and consume the whole message
        prop_assert_eq!(decoded, message);
        prop_assert_eq!(consumed, wire.len());
    });
}

#[test]
fn prop_server_message_roundtrip() {
    proptest!(|(message in arbitrary_server_message())| {
        let mut wire = Vec::new();
        message.encode(&mut wire).expect("encode should succeed");

        let (decoded, consumed) = ServerMessage::decode(&wire).expect("decode should succeed");

        prop_assert_eq!(decoded, message);
        prop_assert_eq!(consumed, wire.len());
    });
}

#[test]
fn prop_strict_prefix_is_incomplete() {
    proptest!(|(message in arbitrary_client_message(), cut in any::<prop::sample::Index>())| {
        let mut wire = Vec::new();
        message.encode(&mut wire).expect("encode should succeed");

        let cut = cut.index(wire.len());

        // PROPERTY: A message cut anywhere before its end never decodes and
        // never reads as malformed - a stream transport must keep reading.
        let err = ClientMessage::decode(&wire[..cut]).expect_err("prefix must not decode");
        prop_assert!(err.is_incomplete(), "cut at {}: {:?}", cut, err);
    });
}

#[test]
fn prop_back_to_back_messages_decode_in_order() {
    proptest!(|(
        first in arbitrary_client_message(),
        second in arbitrary_client_message(),
    )| {
        let mut wire = Vec::new();
        first.encode(&mut wire).expect("encode should succeed");
        second.encode(&mut wire).expect("encode should succeed");

        // PROPERTY: Consumed offsets delimit messages exactly, so a receive
        // buffer holding several messages yields them one by one.
        let (decoded_first, used) = ClientMessage::decode(&wire).expect("first should decode");
        let (decoded_second, rest) =
            ClientMessage::decode(&wire[used..]).expect("second should decode");

        prop_assert_eq!(decoded_first, first);
        prop_assert_eq!(decoded_second, second);
        prop_assert_eq!(used + rest, wire.len());
    });
}

#[test]
fn prop_decode_never_panics_on_arbitrary_bytes() {
    proptest!(|(bytes in prop::collection::vec(any::<u8>(), 0..512))| {
        // PROPERTY: Arbitrary input is rejected or decoded, never a panic.
        let _ = ClientMessage::decode(&bytes);
        let _ = ServerMessage::decode(&bytes);
    });
}

#[test]
fn prop_winners_count_matches_list() {
    proptest!(|(documents in prop::collection::vec(arbitrary_digits(), 0..32))| {
        let mut wire = Vec::new();
        ServerMessage::Winners(documents.clone()).encode(&mut wire).expect("encode");

        // PROPERTY: The u8 count on the wire is exactly the list length
        prop_assert_eq!(wire[1] as usize, documents.len());
    });
}
