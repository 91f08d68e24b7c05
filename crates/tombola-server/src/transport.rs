//! TCP session transport.
//!
//! Wraps one accepted connection. Receiving is a buffered try-decode loop:
//! the pure codec is run against whatever has arrived so far and, while it
//! reports *incomplete*, more bytes are read - so a message split across any
//! number of TCP segments is reassembled and a short read never yields a
//! partial message. Sends go through `write_all`, so short writes never
//! escape either.
//!
//! The transport owns the socket; dropping it (session end) closes the
//! connection.

use std::net::SocketAddr;

use bytes::{Buf, BytesMut};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tombola_proto::{ClientMessage, MessageKind, ServerMessage};

use crate::error::SessionError;

/// Initial capacity of the receive buffer; grows as needed.
const READ_BUFFER_CAPACITY: usize = 4096;

/// One client connection.
#[derive(Debug)]
pub struct Transport {
    stream: TcpStream,
    peer: SocketAddr,
    read_buf: BytesMut,
}

impl Transport {
    /// Wrap an accepted stream.
    #[must_use]
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self { stream, peer, read_buf: BytesMut::with_capacity(READ_BUFFER_CAPACITY) }
    }

    /// Peer address, for logging.
    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Receive the next message from the peer.
    ///
    /// # Errors
    ///
    /// - `SessionError::ConnectionClosed` when the peer hangs up, cleanly
    ///   between messages or mid-frame
    /// - `SessionError::Protocol` when the bytes cannot form a valid
    ///   message; carries the kind the tag byte named, if any, so the
    ///   caller can answer a broken bet batch with a failure confirmation
    /// - `SessionError::Io` for socket failures
    pub async fn recv_message(&mut self) -> Result<ClientMessage, SessionError> {
        loop {
            if !self.read_buf.is_empty() {
                match ClientMessage::decode(&self.read_buf) {
                    Ok((message, consumed)) => {
                        self.read_buf.advance(consumed);
                        return Ok(message);
                    },
                    Err(err) if err.is_incomplete() => {},
                    Err(err) => {
                        let kind = self.read_buf.first().copied().and_then(MessageKind::from_u8);
                        return Err(SessionError::Protocol { kind, source: err });
                    },
                }
            }

            let read = self.stream.read_buf(&mut self.read_buf).await?;
            if read == 0 {
                return Err(SessionError::ConnectionClosed);
            }
        }
    }

    /// Confirm a stored batch.
    pub async fn send_batch_success(&mut self) -> Result<(), SessionError> {
        self.send(&ServerMessage::BatchConfirmation { accepted: true }).await
    }

    /// Reject a batch.
    pub async fn send_batch_failure(&mut self) -> Result<(), SessionError> {
        self.send(&ServerMessage::BatchConfirmation { accepted: false }).await
    }

    /// Legacy polling reply: the draw has not happened yet.
    pub async fn send_no_winners_yet(&mut self) -> Result<(), SessionError> {
        self.send(&ServerMessage::NoWinnersYet).await
    }

    /// Send the winners list; an empty list is a valid answer.
    pub async fn send_winners(&mut self, documents: &[String]) -> Result<(), SessionError> {
        self.send(&ServerMessage::Winners(documents.to_vec())).await
    }

    async fn send(&mut self, message: &ServerMessage) -> Result<(), SessionError> {
        let mut wire = Vec::with_capacity(64);
        message
            .encode(&mut wire)
            .map_err(|source| SessionError::Protocol { kind: Some(message.kind()), source })?;

        self.stream.write_all(&wire).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic, reason = "test code")]

    use tokio::{io::AsyncWriteExt, net::TcpListener};
    use tombola_proto::{Bet, ProtocolError};

    use super::*;

    /// A connected (client stream, server transport) pair over loopback.
    async fn tcp_pair() -> (TcpStream, Transport) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let client = TcpStream::connect(addr).await.expect("connect");
        let (server, peer) = listener.accept().await.expect("accept");

        (client, Transport::new(server, peer))
    }

    fn encoded(message: &ClientMessage) -> Vec<u8> {
        let mut wire = Vec::new();
        message.encode(&mut wire).expect("encode");
        wire
    }

    #[tokio::test]
    async fn message_split_across_writes_is_reassembled() {
        let (mut client, mut transport) = tcp_pair().await;

        let message = ClientMessage::BetBatch(vec![Bet {
            agency: 1,
            first_name: "Ana".to_owned(),
            last_name: "Perez".to_owned(),
            document: "123".to_owned(),
            birthdate: "2000-01-01".to_owned(),
            number: "7574".to_owned(),
        }]);
        let wire = encoded(&message);

        // Dribble the message one byte at a time.
        let writer = tokio::spawn(async move {
            for byte in wire {
                client.write_all(&[byte]).await.expect("write");
                client.flush().await.expect("flush");
            }
            client
        });

        let received = transport.recv_message().await.expect("recv");
        assert_eq!(received, message);
        drop(writer.await.expect("writer task"));
    }

    #[tokio::test]
    async fn back_to_back_messages_arrive_one_by_one() {
        let (mut client, mut transport) = tcp_pair().await;

        let first = ClientMessage::Finalization { agency: 3 };
        let second = ClientMessage::GetWinners { agency: 3 };
        let mut wire = encoded(&first);
        wire.extend_from_slice(&encoded(&second));
        client.write_all(&wire).await.expect("write");

        assert_eq!(transport.recv_message().await.expect("recv"), first);
        assert_eq!(transport.recv_message().await.expect("recv"), second);
    }

    #[tokio::test]
    async fn unknown_tag_reports_protocol_error_without_a_kind() {
        let (mut client, mut transport) = tcp_pair().await;
        client.write_all(&[9, 1, 2, 3]).await.expect("write");

        let err = transport.recv_message().await.expect_err("must fail");
        match err {
            SessionError::Protocol { kind: None, source: ProtocolError::UnknownTag(9) } => {},
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn broken_batch_reports_the_batch_kind() {
        let (mut client, mut transport) = tcp_pair().await;

        // One-bet batch whose first_name field carries invalid UTF-8.
        let mut wire = vec![0, 0, 0, 0, 1];
        wire.extend_from_slice(&[1, b'1']); // agency "1"
        wire.extend_from_slice(&[1, 0xFF]); // first_name
        client.write_all(&wire).await.expect("write");

        let err = transport.recv_message().await.expect_err("must fail");
        match err {
            SessionError::Protocol {
                kind: Some(MessageKind::BetBatch),
                source: ProtocolError::InvalidUtf8,
            } => {},
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn peer_hangup_mid_frame_is_connection_closed() {
        let (mut client, mut transport) = tcp_pair().await;

        // Half a Finalization, then hang up.
        client.write_all(&[2, 5, b'1']).await.expect("write");
        drop(client);

        let err = transport.recv_message().await.expect_err("must fail");
        assert!(matches!(err, SessionError::ConnectionClosed), "{err:?}");
    }

    #[tokio::test]
    async fn clean_hangup_is_connection_closed() {
        let (client, mut transport) = tcp_pair().await;
        drop(client);

        let err = transport.recv_message().await.expect_err("must fail");
        assert!(matches!(err, SessionError::ConnectionClosed), "{err:?}");
    }
}
