//! The plaintext RTMP handshake, as performed by a client.
//!
//! Each side sends a version byte followed by a 1536 byte signature, then echoes back the
//! signature it received from the other side.  The handshake is finished once our own
//! signature has come back.
//!
//! The `HandShaker` never blocks.  Every call to `call()` advances through as many stages as the
//! transport currently allows and stops at the first one that has to wait.

mod errors;

pub use self::errors::HandshakeError;

use crate::byte_order::read_network_long;
use crate::transport::Transport;
use byteorder::{BigEndian, ByteOrder};
use rand::Rng;
use tracing::{debug, error, warn};

/// Size of the signature each side sends
pub const SIGNATURE_SIZE: usize = 1536;

/// Version byte announcing an unencrypted handshake
pub const PLAINTEXT_VERSION: u8 = 0x03;

// uptime (4 bytes) + zeros (4 bytes)
const RANDOM_DATA_OFFSET: usize = 8;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum Stage {
    SendSignature,
    ReadPeerSignature,
    EchoPeerSignature,
    ReadEchoedSignature,
    Complete,
}

impl Stage {
    fn number(self) -> u8 {
        match self {
            Stage::SendSignature => 0,
            Stage::ReadPeerSignature => 1,
            Stage::EchoPeerSignature => 2,
            Stage::ReadEchoedSignature => 3,
            Stage::Complete => 4,
        }
    }

    fn next(self) -> Stage {
        match self {
            Stage::SendSignature => Stage::ReadPeerSignature,
            Stage::ReadPeerSignature => Stage::EchoPeerSignature,
            Stage::EchoPeerSignature => Stage::ReadEchoedSignature,
            Stage::ReadEchoedSignature | Stage::Complete => Stage::Complete,
        }
    }
}

pub struct HandShaker {
    send_buffer: Vec<u8>,
    receive_buffer: Vec<u8>,
    stage: Stage,
    error: bool,
}

impl HandShaker {
    /// Prepares the version byte and our signature: `uptime`, four zero bytes, then random data.
    pub fn new(uptime: u32) -> HandShaker {
        let mut send_buffer = vec![0_u8; SIGNATURE_SIZE + 1];
        send_buffer[0] = PLAINTEXT_VERSION;

        {
            let signature = &mut send_buffer[1..];
            BigEndian::write_u32(&mut signature[..4], uptime);
            rand::thread_rng().fill(&mut signature[RANDOM_DATA_OFFSET..]);
        }

        HandShaker {
            send_buffer,
            receive_buffer: vec![0_u8; SIGNATURE_SIZE + 1],
            stage: Stage::SendSignature,
            error: false,
        }
    }

    /// Performs as many handshake stages as the transport allows right now
    pub fn call<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        if self.error(transport) || !transport.connected() {
            return;
        }

        while self.stage != Stage::Complete {
            let result = match self.stage {
                Stage::SendSignature => self.send_signature(transport),
                Stage::ReadPeerSignature => self.read_peer_signature(transport),
                Stage::EchoPeerSignature => self.echo_peer_signature(transport),
                Stage::ReadEchoedSignature => self.read_echoed_signature(transport),
                Stage::Complete => Ok(true),
            };

            match result {
                Ok(true) => self.stage = self.stage.next(),
                Ok(false) => return,
                Err(x) => {
                    error!("Handshake failed: {}", x);
                    self.error = true;
                    return;
                }
            }
        }

        debug!("Handshake completed");
    }

    /// True once our signature has been echoed back by the peer
    pub fn success(&self) -> bool {
        self.stage == Stage::Complete
    }

    /// True if the handshake can no longer complete, including when the peer has closed the
    /// connection
    pub fn error<T: Transport + ?Sized>(&self, transport: &T) -> bool {
        self.error || transport.bad() || transport.eof()
    }

    /// The stage the handshake is waiting on (0 to 3), or 4 once complete
    pub fn stage(&self) -> u8 {
        self.stage.number()
    }

    /// Our signature, as sent in stage 0
    pub fn signature(&self) -> &[u8] {
        &self.send_buffer[1..]
    }

    fn send_signature<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<bool, HandshakeError> {
        let sent = transport.write(&self.send_buffer);
        if sent == 0 {
            debug!("Transport not ready to send the handshake signature");
            return Ok(false);
        }

        check_write(0, sent, self.send_buffer.len())?;
        Ok(true)
    }

    fn read_peer_signature<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<bool, HandshakeError> {
        let read = transport.read(&mut self.receive_buffer);
        if read == 0 {
            return Ok(false);
        }

        if read != self.receive_buffer.len() {
            return Err(HandshakeError::IncompleteRead {
                stage: 1,
                read,
                expected: self.receive_buffer.len(),
            });
        }

        if self.receive_buffer[0] != self.send_buffer[0] {
            warn!(
                "Type mismatch: client sent {}, server answered {}",
                self.send_buffer[0], self.receive_buffer[0]
            );
        }

        let peer_signature = &self.receive_buffer[1..];
        debug!("Server uptime: {}", read_network_long(peer_signature));
        debug!(
            "FMS version: {}.{}.{}.{}",
            peer_signature[4], peer_signature[5], peer_signature[6], peer_signature[7]
        );

        Ok(true)
    }

    fn echo_peer_signature<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<bool, HandshakeError> {
        let sent = transport.write(&self.receive_buffer[1..]);
        if sent == 0 {
            return Ok(false);
        }

        check_write(2, sent, SIGNATURE_SIZE)?;
        Ok(true)
    }

    fn read_echoed_signature<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<bool, HandshakeError> {
        let read = transport.read(&mut self.receive_buffer[..SIGNATURE_SIZE]);
        if read == 0 {
            return Ok(false);
        }

        if read != SIGNATURE_SIZE {
            return Err(HandshakeError::IncompleteRead {
                stage: 3,
                read,
                expected: SIGNATURE_SIZE,
            });
        }

        // The connection goes ahead even when the peer echoed something else
        if self.receive_buffer[..SIGNATURE_SIZE] != self.send_buffer[1..] {
            warn!("Signatures do not match during handshake!");
        }

        Ok(true)
    }
}

fn check_write(stage: u8, sent: usize, expected: usize) -> Result<(), HandshakeError> {
    if sent != expected {
        return Err(HandshakeError::IncompleteWrite {
            stage,
            sent,
            expected,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use byteorder::{BigEndian, ReadBytesExt};
    use std::io::Cursor;

    fn connected_pair() -> (MemoryTransport, MemoryTransport) {
        let (mut local, mut peer) = MemoryTransport::pair();
        local.connect("localhost", 1935).unwrap();
        peer.connect("localhost", 1935).unwrap();
        (local, peer)
    }

    fn read_all(transport: &mut MemoryTransport) -> Vec<u8> {
        let mut bytes = vec![0_u8; transport.available()];
        transport.read(&mut bytes);
        bytes
    }

    fn peer_packet() -> Vec<u8> {
        let mut packet = vec![PLAINTEXT_VERSION];
        packet.extend_from_slice(&[0, 0, 0x30, 0x39, 3, 5, 1, 0]);
        packet.extend((0..SIGNATURE_SIZE - 8).map(|x| (x % 251) as u8));
        packet
    }

    fn write_in_pieces(transport: &mut MemoryTransport, handshaker: &mut HandShaker, local: &mut MemoryTransport, bytes: &[u8]) {
        for piece in bytes.chunks(100) {
            transport.write(piece);
            handshaker.call(local);
        }
    }

    #[test]
    fn stage_0_sends_version_uptime_zeros_and_random_data() {
        let (mut local, mut peer) = connected_pair();
        let mut handshaker = HandShaker::new(12345);
        handshaker.call(&mut local);

        let bytes = read_all(&mut peer);
        assert_eq!(bytes.len(), SIGNATURE_SIZE + 1);

        let mut cursor = Cursor::new(&bytes);
        assert_eq!(cursor.read_u8().unwrap(), 3, "Unexpected version");
        assert_eq!(cursor.read_u32::<BigEndian>().unwrap(), 12345, "Unexpected uptime");
        assert_eq!(cursor.read_u32::<BigEndian>().unwrap(), 0, "Unexpected zeros");
        assert!(bytes[9..].iter().any(|x| *x != 0), "Random data was all zeros");
        assert_eq!(handshaker.stage(), 1);
    }

    #[test]
    fn random_data_differs_between_handshakes() {
        let first = HandShaker::new(0);
        let second = HandShaker::new(0);

        assert_ne!(first.signature(), second.signature());
    }

    #[test]
    fn completes_when_bytes_arrive_in_pieces() {
        let (mut local, mut peer) = connected_pair();
        let mut handshaker = HandShaker::new(0);
        handshaker.call(&mut local);
        let our_packet = read_all(&mut peer);

        let their_packet = peer_packet();
        write_in_pieces(&mut peer, &mut handshaker, &mut local, &their_packet);
        assert_eq!(handshaker.stage(), 3);

        let echoed = read_all(&mut peer);
        assert_eq!(&echoed[..], &their_packet[1..], "Peer signature was not echoed back");

        write_in_pieces(&mut peer, &mut handshaker, &mut local, &our_packet[1..]);

        assert!(handshaker.success(), "Handshake did not complete");
        assert!(!handshaker.error(&local), "Handshake reported an error");
    }

    #[test]
    fn runs_every_stage_in_one_call_when_data_is_ready() {
        let (mut local, mut peer) = connected_pair();
        let mut handshaker = HandShaker::new(0);
        handshaker.call(&mut local);
        let our_packet = read_all(&mut peer);

        peer.write(&peer_packet());
        peer.write(&our_packet[1..]);
        handshaker.call(&mut local);

        assert!(handshaker.success());
        assert_eq!(handshaker.stage(), 4);
    }

    #[test]
    fn mismatched_echo_is_tolerated() {
        let (mut local, mut peer) = connected_pair();
        let mut handshaker = HandShaker::new(0);
        handshaker.call(&mut local);
        let _ = read_all(&mut peer);

        peer.write(&peer_packet());
        peer.write(&[0xaa_u8; SIGNATURE_SIZE]);
        handshaker.call(&mut local);

        assert!(handshaker.success(), "Mismatched echo stopped the handshake");
        assert!(!handshaker.error(&local), "Mismatched echo was treated as an error");
    }

    #[test]
    fn mismatched_version_byte_is_tolerated() {
        let (mut local, mut peer) = connected_pair();
        let mut handshaker = HandShaker::new(0);
        handshaker.call(&mut local);
        let our_packet = read_all(&mut peer);

        let mut their_packet = peer_packet();
        their_packet[0] = 6;
        peer.write(&their_packet);
        peer.write(&our_packet[1..]);
        handshaker.call(&mut local);

        assert!(handshaker.success());
    }

    #[test]
    fn transport_not_ready_to_write_is_retried() {
        let (mut local, mut peer) = connected_pair();
        local.set_write_limit(Some(0));
        let mut handshaker = HandShaker::new(0);
        handshaker.call(&mut local);

        assert_eq!(handshaker.stage(), 0);
        assert!(!handshaker.error(&local));

        local.set_write_limit(None);
        handshaker.call(&mut local);

        assert_eq!(handshaker.stage(), 1);
        assert_eq!(peer.available(), SIGNATURE_SIZE + 1);
    }

    #[test]
    fn partial_write_is_fatal() {
        let (mut local, _peer) = connected_pair();
        local.set_write_limit(Some(100));
        let mut handshaker = HandShaker::new(0);
        handshaker.call(&mut local);

        assert!(handshaker.error(&local));
        assert!(!handshaker.success());
    }

    #[test]
    fn bad_transport_is_reported_as_error() {
        let (mut local, _peer) = connected_pair();
        let handshaker = HandShaker::new(0);
        local.set_bad(true);

        assert!(handshaker.error(&local));
    }

    #[test]
    fn peer_closing_mid_handshake_is_reported_as_error() {
        let (mut local, mut peer) = connected_pair();
        let mut handshaker = HandShaker::new(0);
        handshaker.call(&mut local);
        let _ = read_all(&mut peer);

        peer.close();
        handshaker.call(&mut local);

        assert!(handshaker.error(&local), "Closed peer was not reported");
        assert!(!handshaker.success());
        assert_eq!(handshaker.stage(), 1);
    }

    #[test]
    fn nothing_happens_on_unconnected_transport() {
        let (mut local, _peer) = MemoryTransport::pair();
        let mut handshaker = HandShaker::new(0);
        handshaker.call(&mut local);

        assert_eq!(handshaker.stage(), 0);
    }
}
