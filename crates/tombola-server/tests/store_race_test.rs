//! Concurrent batches racing the file-backed store.
//!
//! Two agencies stream large batches simultaneously against a real CSV
//! store. The file lock must serialize the writes so the final store holds
//! exactly the union of both batches with each batch's internal order
//! intact, and the draw must see every committed bet.

#![allow(clippy::expect_used, clippy::panic, reason = "test code")]

use std::time::Duration;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tombola_proto::{Bet, ClientMessage, ServerMessage};
use tombola_server::{
    Server, ServerConfig,
    store::{BetStore, CsvStore},
};

const BATCH_SIZE: usize = 100;

fn bet(agency: u32, document: String, number: &str) -> Bet {
    Bet {
        agency,
        first_name: "Maria".to_owned(),
        last_name: "Lopez".to_owned(),
        document,
        birthdate: "1985-07-07".to_owned(),
        number: number.to_owned(),
    }
}

/// `BATCH_SIZE` bets for one agency, documents `base..base + BATCH_SIZE`.
fn batch_for(agency: u32, base: u32, number: &str) -> Vec<Bet> {
    (0..BATCH_SIZE as u32).map(|i| bet(agency, (base + i).to_string(), number)).collect()
}

async fn send(stream: &mut TcpStream, message: &ClientMessage) {
    let mut wire = Vec::new();
    message.encode(&mut wire).expect("encode");
    stream.write_all(&wire).await.expect("write");
}

async fn recv(stream: &mut TcpStream) -> ServerMessage {
    let mut buf = Vec::new();
    loop {
        match ServerMessage::decode(&buf) {
            Ok((message, _)) => return message,
            Err(err) if err.is_incomplete() => {},
            Err(err) => panic!("bad server message: {err:?}"),
        }
        let mut chunk = [0u8; 4096];
        let read = stream.read(&mut chunk).await.expect("read");
        assert!(read > 0, "server closed before replying");
        buf.extend_from_slice(&chunk[..read]);
    }
}

/// One agency's whole run: batch, finalize, collect winners.
async fn agency_run(addr: std::net::SocketAddr, agency: u32, bets: Vec<Bet>) -> Vec<String> {
    let mut stream = TcpStream::connect(addr).await.expect("connect");

    send(&mut stream, &ClientMessage::BetBatch(bets)).await;
    assert_eq!(recv(&mut stream).await, ServerMessage::BatchConfirmation { accepted: true });

    send(&mut stream, &ClientMessage::Finalization { agency }).await;
    send(&mut stream, &ClientMessage::GetWinners { agency }).await;

    match recv(&mut stream).await {
        ServerMessage::Winners(documents) => documents,
        other => panic!("expected winners, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_batches_serialize_into_the_union() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = CsvStore::new(dir.path().join("bets.csv"));

    let config = ServerConfig {
        port: 0,
        number_of_clients: 2,
        barrier_timeout: Duration::from_secs(10),
        winning_number: 7,
        ..ServerConfig::default()
    };
    let server = Server::bind(config, store.clone()).expect("bind");
    let addr = server.local_addr().expect("local addr");
    let server = tokio::spawn(server.run());

    // Agency 1's bets all win, agency 2's all lose.
    let first_batch = batch_for(1, 1_000, "7");
    let second_batch = batch_for(2, 2_000, "8");

    let first = tokio::spawn(agency_run(addr, 1, first_batch.clone()));
    let second = tokio::spawn(agency_run(addr, 2, second_batch.clone()));

    let first_winners = first.await.expect("agency 1");
    let second_winners = second.await.expect("agency 2");
    server.await.expect("task").expect("run");

    // Every one of agency 1's bets won; agency 2 drew blanks.
    let expected: Vec<String> = first_batch.iter().map(|b| b.document.clone()).collect();
    assert_eq!(first_winners, expected);
    assert!(second_winners.is_empty());

    // The store holds exactly the union of both batches.
    let stored = store.load_bets().expect("scan");
    assert_eq!(stored.len(), BATCH_SIZE * 2);

    // Per-batch order survived the race: each agency's documents appear in
    // the file in the order they were sent, whatever the interleaving.
    for (agency, sent) in [(1u32, &first_batch), (2u32, &second_batch)] {
        let in_file: Vec<&str> = stored
            .iter()
            .filter(|b| b.agency == agency)
            .map(|b| b.document.as_str())
            .collect();
        let as_sent: Vec<&str> = sent.iter().map(|b| b.document.as_str()).collect();
        assert_eq!(in_file, as_sent, "agency {agency} batch order was not preserved");
    }
}

#[tokio::test]
async fn draw_observes_bets_committed_by_the_other_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = CsvStore::new(dir.path().join("bets.csv"));

    let config = ServerConfig {
        port: 0,
        number_of_clients: 2,
        barrier_timeout: Duration::from_secs(10),
        winning_number: 7,
        ..ServerConfig::default()
    };
    let server = Server::bind(config, store).expect("bind");
    let addr = server.local_addr().expect("local addr");
    let server = tokio::spawn(server.run());

    // Both agencies bet on the winning number; each draw runs after the
    // barrier, so each must see only its own wins - but computed over the
    // full store that both sessions populated.
    let first = tokio::spawn(agency_run(addr, 1, vec![bet(1, "111".to_owned(), "7")]));
    let second = tokio::spawn(agency_run(addr, 2, vec![bet(2, "222".to_owned(), "7")]));

    assert_eq!(first.await.expect("agency 1"), vec!["111".to_owned()]);
    assert_eq!(second.await.expect("agency 2"), vec!["222".to_owned()]);

    server.await.expect("task").expect("run");
}
