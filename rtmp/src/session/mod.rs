//! The RTMP session controller.
//!
//! An `RtmpSession` owns its transport and is driven by calling `update()` repeatedly from the
//! host's event loop.  Until the handshake has completed each call advances the handshake.  Once
//! connected each call reads up to `reads_per_update` chunks, reassembles them into messages and
//! handles at most one complete message before returning.  All partial progress (a half read
//! header, a half received payload, the handshake stage) is kept in the session so the next call
//! picks up exactly where the last one stopped.
//!
//! Protocol control messages (chunk size, control, bandwidth) are handled by the session itself.
//! Invoke and FLV messages are queued for the caller to collect with `get_message()` and
//! `get_flv_frame()`.

mod config;
mod errors;


pub use self::config::{SessionConfig, DEFAULT_BANDWIDTH, DEFAULT_CHUNK_SIZE, DEFAULT_PORT};
pub use self::errors::SessionError;

use crate::chunk_io::{
    continuation_header, decode_header, encode_header, header_length, select_header_type,
    ChunkReadError, MAX_HEADER_LENGTH,
};
use crate::handshake::HandShaker;
use crate::messages::{self, ControlMessage, ControlType};
use crate::packet::{ChannelStore, Direction, Packet, PacketType};
use crate::packet::{CHANNEL_CONTROL1, CHANNEL_CONTROL2, CHANNEL_VIDEO};
use crate::time::{Clock, MonotonicClock};
use crate::transport::Transport;
use bytes::BytesMut;
use std::cmp::min;
use std::collections::VecDeque;
use tracing::{debug, error, info, trace, warn};
use url::Url;

/// Limit type assumed until the peer announces one
const DEFAULT_LIMIT_TYPE: u8 = 2;

const MAX_CHUNK_SIZE: u32 = 0x7fff_ffff;

pub struct RtmpSession<T: Transport, C: Clock = MonotonicClock> {
    transport: T,
    clock: C,
    config: SessionConfig,
    span: tracing::Span,
    handshaker: Option<HandShaker>,
    channels: ChannelStore,
    incomplete_packet: Option<Packet>,
    pending_header: Vec<u8>,
    message_queue: VecDeque<Packet>,
    flv_queue: VecDeque<Packet>,
    in_chunk_size: usize,
    out_chunk_size: usize,
    bytes_in: u64,
    bytes_in_sent: u64,
    bandwidth: u32,
    server_bandwidth: u32,
    bandwidth_limit_type: u8,
    media_channel: Option<u32>,
    connected: bool,
    error: bool,
}

impl<T: Transport> RtmpSession<T, MonotonicClock> {
    /// Creates a session timestamping its messages with the system's monotonic clock
    pub fn new(transport: T, config: SessionConfig) -> RtmpSession<T, MonotonicClock> {
        RtmpSession::with_clock(transport, config, MonotonicClock::new())
    }
}

impl<T: Transport, C: Clock> RtmpSession<T, C> {
    pub fn with_clock(transport: T, config: SessionConfig, clock: C) -> RtmpSession<T, C> {
        RtmpSession {
            transport,
            clock,
            span: tracing::info_span!("rtmp_session", url = tracing::field::Empty),
            handshaker: None,
            channels: ChannelStore::new(),
            incomplete_packet: None,
            pending_header: Vec::with_capacity(MAX_HEADER_LENGTH),
            message_queue: VecDeque::new(),
            flv_queue: VecDeque::new(),
            in_chunk_size: DEFAULT_CHUNK_SIZE,
            out_chunk_size: DEFAULT_CHUNK_SIZE,
            bytes_in: 0,
            bytes_in_sent: 0,
            bandwidth: config.bandwidth,
            server_bandwidth: config.server_bandwidth,
            bandwidth_limit_type: DEFAULT_LIMIT_TYPE,
            media_channel: None,
            connected: false,
            error: false,
            config,
        }
    }

    /// Replaces the span every operation of the session is logged in
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Opens the transport to the host of `url` and starts the handshake.
    ///
    /// Returning `Ok` only means the connection attempt has started.  The session is connected
    /// once `connected()` returns true, after enough calls to `update()`.
    pub fn connect(&mut self, url: &str) -> Result<(), SessionError> {
        let span = self.span.clone();
        let _enter = span.enter();
        self.span.record("url", url);

        let (host, port) = parse_url(url, self.config.default_port)?;
        info!("Connecting to {}:{}", host, port);

        if let Err(x) = self.transport.connect(&host, port) {
            error!("Initial connection failed: {}", x);
            return Err(SessionError::ConnectionFailed(x));
        }

        let mut handshaker = HandShaker::new(self.clock.uptime_ms());
        handshaker.call(&mut self.transport);
        self.handshaker = Some(handshaker);

        Ok(())
    }

    /// Performs whatever work the transport currently allows.  Never blocks.
    pub fn update(&mut self) {
        let span = self.span.clone();
        let _enter = span.enter();

        if !self.connected && !self.complete_handshake() {
            return;
        }

        for _ in 0..self.config.reads_per_update {
            if self.error {
                return;
            }

            let mut packet = match self.incomplete_packet.take() {
                Some(packet) => {
                    trace!("Resuming incomplete packet on channel {}", packet.header.channel);
                    packet
                }

                None => match self.read_packet_header() {
                    Ok(Some(packet)) => packet,
                    Ok(None) => continue,
                    Err(x) => {
                        error!("Failed to read chunk header: {}", x);
                        return;
                    }
                },
            };

            if !self.read_packet_payload(&mut packet) {
                self.incomplete_packet = Some(packet);
                continue;
            }

            let stored = self.channels.store(Direction::Incoming, packet);
            if stored.is_ready() {
                let packet = stored.detach();
                self.handle_packet(packet);
                return;
            }
        }
    }

    /// Reads exactly `buffer.len()` bytes from the transport, or nothing.
    ///
    /// Every byte read counts towards the acknowledgement sent to the peer once more than half
    /// the client bandwidth has been received since the last one.  A failed transport sets the
    /// session's error flag.
    pub fn read_socket(&mut self, buffer: &mut [u8]) -> usize {
        let span = self.span.clone();
        let _enter = span.enter();

        let read = self.transport.read(buffer);

        if self.transport.bad() || self.transport.eof() || !self.transport.connected() {
            if !self.error {
                error!("Transport failed or was closed by the peer");
            }

            self.error = true;
            return 0;
        }

        if read == 0 {
            return 0;
        }

        self.bytes_in += read as u64;
        if self.bytes_in > self.bytes_in_sent + (self.bandwidth / 2) as u64 {
            match self.send_bytes_received() {
                Ok(()) => debug!("Sent bytes received"),
                Err(x) => error!("Failed to send bytes received: {}", x),
            }
        }

        read
    }

    /// Splits `packet` into chunks and writes them to the transport.
    ///
    /// The header is compressed against the last packet sent on the same channel and timestamped
    /// with the current uptime.  The data size is taken from the payload.
    pub fn send_packet(&mut self, mut packet: Packet) -> Result<(), SessionError> {
        let span = self.span.clone();
        let _enter = span.enter();

        if !self.transport.connected() {
            return Err(SessionError::NotConnected);
        }

        let channel = packet.header.channel;
        let data_size = packet.payload_size();
        let uptime = self.clock.uptime_ms();

        let previous = self
            .channels
            .get(Direction::Outgoing, channel)
            .map(|x| &x.header);

        let (header_type, timestamp) =
            select_header_type(previous, uptime, data_size, packet.header.packet_type);

        packet.header.header_type = header_type;
        packet.header.timestamp = timestamp;
        packet.header.data_size = data_size;

        let header = encode_header(&packet.header)?;
        let continuation = continuation_header(channel)?;
        let payload = packet.payload().unwrap_or(&[]);

        let chunk_count = (data_size + self.out_chunk_size - 1) / self.out_chunk_size;
        let mut bytes = BytesMut::with_capacity(header.len() + data_size + chunk_count * continuation.len());
        bytes.extend_from_slice(header.as_slice());
        for (index, chunk) in payload.chunks(self.out_chunk_size).enumerate() {
            if index > 0 {
                bytes.extend_from_slice(continuation.as_slice());
            }

            bytes.extend_from_slice(chunk);
        }

        let written = self.transport.write(&bytes[..]);
        if written != bytes.len() {
            error!("Only {} of {} bytes of a {} could be sent", written, bytes.len(), packet.header.packet_type);
            return Err(SessionError::IncompleteWrite {
                written,
                expected: bytes.len(),
            });
        }

        trace!(
            "Sent {} on channel {} with a {:?} header",
            packet.header.packet_type,
            channel,
            header_type
        );

        if packet.header.packet_type == PacketType::Invoke {
            match rtmp_amf0::read_string(payload) {
                Ok(method) => debug!("Calling remote method {}", method),
                Err(x) => warn!("Invoke sent without a method name: {}", x),
            }
        }

        packet.header.timestamp = uptime;
        self.channels
            .store(Direction::Outgoing, Packet::header_only(packet.header));

        Ok(())
    }

    /// Sends an AMF encoded remote method call on the invoke channel
    pub fn call(&mut self, amf_payload: &[u8]) -> Result<(), SessionError> {
        let span = self.span.clone();
        let _enter = span.enter();

        self.send_packet(Packet::new(CHANNEL_CONTROL2, PacketType::Invoke, amf_payload))
    }

    /// Sends an AMF encoded `play` call for the NetStream `stream_id`
    pub fn play(&mut self, amf_payload: &[u8], stream_id: u32) -> Result<(), SessionError> {
        let span = self.span.clone();
        let _enter = span.enter();

        let mut packet = Packet::new(CHANNEL_VIDEO, PacketType::Invoke, amf_payload);
        packet.header.stream_id = stream_id;
        self.send_packet(packet)
    }

    /// Tells the peer how many milliseconds of `stream_id` to buffer
    pub fn set_buffer_time(&mut self, milliseconds: u32, stream_id: u32) -> Result<(), SessionError> {
        let span = self.span.clone();
        let _enter = span.enter();

        self.send_ctrl(ControlType::BufferTime, stream_id, milliseconds)
    }

    /// Sends a control message.  `time` is only transmitted for buffer time messages.
    pub fn send_ctrl(&mut self, control_type: ControlType, object: u32, time: u32) -> Result<(), SessionError> {
        let span = self.span.clone();
        let _enter = span.enter();

        debug!("Sending control type {}", control_type);

        let payload = ControlMessage::new(control_type, object, time).serialize();
        self.send_packet(Packet::new(CHANNEL_CONTROL1, PacketType::Control, &payload))
    }

    /// Sends the stored server bandwidth to the peer
    pub fn send_server_bandwidth(&mut self) -> Result<(), SessionError> {
        let span = self.span.clone();
        let _enter = span.enter();

        let payload = messages::serialize_server_bandwidth(self.server_bandwidth);
        self.send_packet(Packet::new(CHANNEL_CONTROL1, PacketType::ServerBandwidth, &payload))
    }

    /// Announces a new outgoing chunk size to the peer and uses it for every message sent
    /// afterwards
    pub fn set_chunk_size(&mut self, size: u32) -> Result<(), SessionError> {
        let span = self.span.clone();
        let _enter = span.enter();

        if size == 0 || size > MAX_CHUNK_SIZE {
            return Err(SessionError::InvalidChunkSize { size });
        }

        let payload = messages::serialize_chunk_size(size);
        self.send_packet(Packet::new(CHANNEL_CONTROL1, PacketType::ChunkSize, &payload))?;
        self.out_chunk_size = size as usize;
        debug!("Outgoing chunk size set to {}", size);

        Ok(())
    }

    /// Closes the transport and returns the session to the state it had before `connect()`.
    ///
    /// Messages already queued stay available to `get_message()` and `get_flv_frame()`.
    pub fn close(&mut self) {
        let span = self.span.clone();
        let _enter = span.enter();
        debug!("Closing session");

        self.transport.close();
        self.handshaker = None;
        self.channels.clear();
        self.incomplete_packet = None;
        self.pending_header.clear();
        self.in_chunk_size = DEFAULT_CHUNK_SIZE;
        self.out_chunk_size = DEFAULT_CHUNK_SIZE;
        self.bytes_in = 0;
        self.bytes_in_sent = 0;
        self.bandwidth = self.config.bandwidth;
        self.server_bandwidth = self.config.server_bandwidth;
        self.bandwidth_limit_type = DEFAULT_LIMIT_TYPE;
        self.media_channel = None;
        self.connected = false;
        self.error = false;
    }

    /// The oldest invoke (or flex) message not yet collected
    pub fn get_message(&mut self) -> Option<Packet> {
        self.message_queue.pop_front()
    }

    /// The oldest FLV message not yet collected
    pub fn get_flv_frame(&mut self) -> Option<Packet> {
        self.flv_queue.pop_front()
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    /// True once the handshake or the transport has failed
    pub fn error(&self) -> bool {
        self.error
    }

    pub fn bandwidth(&self) -> u32 {
        self.bandwidth
    }

    pub fn set_bandwidth(&mut self, bandwidth: u32) {
        self.bandwidth = bandwidth;
    }

    pub fn server_bandwidth(&self) -> u32 {
        self.server_bandwidth
    }

    pub fn set_server_bandwidth(&mut self, bandwidth: u32) {
        self.server_bandwidth = bandwidth;
    }

    /// The limit type the peer sent with its client bandwidth, 0xff if it sent none
    pub fn bandwidth_limit_type(&self) -> u8 {
        self.bandwidth_limit_type
    }

    /// The channel the first audio or video message arrived on
    pub fn media_channel(&self) -> Option<u32> {
        self.media_channel
    }

    pub fn in_chunk_size(&self) -> usize {
        self.in_chunk_size
    }

    pub fn out_chunk_size(&self) -> usize {
        self.out_chunk_size
    }

    /// Total number of bytes read since the connection was opened, handshake excluded
    pub fn bytes_received(&self) -> u64 {
        self.bytes_in
    }

    /// The byte count last acknowledged to the peer
    pub fn bytes_acknowledged(&self) -> u64 {
        self.bytes_in_sent
    }

    /// Returns true once connected.  Runs the handshake otherwise.
    fn complete_handshake(&mut self) -> bool {
        let handshaker = match self.handshaker {
            Some(ref mut handshaker) => handshaker,
            None => return false,
        };

        handshaker.call(&mut self.transport);
        if handshaker.error(&self.transport) || !self.transport.connected() {
            if !self.error {
                error!("Handshake failed or the connection was closed");
            }

            self.error = true;
        }

        if !handshaker.success() {
            return false;
        }

        self.handshaker = None;
        self.connected = true;
        info!("Session connected");

        let chunk_size = self.config.chunk_size;
        if chunk_size as usize != DEFAULT_CHUNK_SIZE {
            if let Err(x) = self.set_chunk_size(chunk_size) {
                error!("Failed to announce chunk size {}: {}", chunk_size, x);
            }
        }

        true
    }

    /// Collects the bytes of the next chunk header, returning the packet it belongs to once the
    /// header is complete.  Header bytes that have arrived are kept until the rest follows.
    fn read_packet_header(&mut self) -> Result<Option<Packet>, ChunkReadError> {
        loop {
            let collected = self.pending_header.len();
            let required = header_length(&self.pending_header);
            if collected == required {
                break;
            }

            let mut bytes = [0_u8; MAX_HEADER_LENGTH];
            let missing = required - collected;
            if self.read_socket(&mut bytes[..missing]) != missing {
                if collected > 0 {
                    trace!("Chunk header incomplete, {} bytes collected", collected);
                }

                return Ok(None);
            }

            self.pending_header.extend_from_slice(&bytes[..missing]);
        }

        let result = decode_header(&self.pending_header, &mut self.channels);
        self.pending_header.clear();

        let packet = result?;
        trace!(
            "Received {:?} header for {} on channel {}",
            packet.header.header_type,
            packet.header.packet_type,
            packet.header.channel
        );

        Ok(Some(packet))
    }

    /// Reads the next chunk of the packet's payload.  Returns false if it has not arrived yet.
    fn read_packet_payload(&mut self, packet: &mut Packet) -> bool {
        let start = packet.bytes_read;
        let count = min(packet.header.data_size - start, self.in_chunk_size);
        if count == 0 {
            return true;
        }

        let payload = match packet.payload_mut() {
            Some(payload) => payload,
            None => return false,
        };

        if self.read_socket(&mut payload[start..start + count]) != count {
            return false;
        }

        packet.bytes_read += count;
        true
    }

    fn handle_packet(&mut self, packet: Packet) {
        let packet_type = packet.header.packet_type;
        let payload = packet.payload().unwrap_or(&[]);
        debug!("Received {}", packet_type);

        match packet_type {
            PacketType::ChunkSize => self.handle_chunk_size(payload),
            PacketType::BytesRead => (),
            PacketType::Control => self.handle_control(payload),
            PacketType::ServerBandwidth => self.handle_server_bandwidth(payload),
            PacketType::ClientBandwidth => self.handle_client_bandwidth(payload),

            PacketType::Audio | PacketType::Video => {
                if self.media_channel.is_none() {
                    self.media_channel = Some(packet.header.channel);
                }
            }

            PacketType::FlexStreamSend | PacketType::FlexSharedObject | PacketType::SharedObject => {
                warn!("Unsupported packet {} received", packet_type);
            }

            PacketType::FlexMessage => {
                warn!("Partially supported packet {} received", packet_type);
                self.message_queue.push_back(packet);
            }

            PacketType::Metadata => (),
            PacketType::Invoke => self.message_queue.push_back(packet),
            PacketType::Flv => self.flv_queue.push_back(packet),

            PacketType::None | PacketType::Unknown(_) => {
                warn!("Unknown packet {} received", packet_type);
            }
        }
    }

    fn handle_chunk_size(&mut self, payload: &[u8]) {
        match messages::deserialize_chunk_size(payload) {
            Ok(0) => warn!("Ignoring chunk size of 0"),
            Ok(size) => {
                self.in_chunk_size = size as usize;
                debug!("Changed chunk size to {}", size);
            }

            Err(x) => error!("Invalid chunk size packet: {}", x),
        }
    }

    fn handle_control(&mut self, payload: &[u8]) {
        let message = match ControlMessage::deserialize(payload) {
            Ok(message) => message,
            Err(x) => {
                error!("Invalid control packet: {}", x);
                return;
            }
        };

        debug!(
            "Received control packet {} with argument {}",
            message.control_type, message.object
        );

        match message.control_type {
            ControlType::Ping => {
                if let Err(x) = self.send_ctrl(ControlType::Pong, message.object, 0) {
                    error!("Failed to answer ping: {}", x);
                }
            }

            ControlType::ResetStream => debug!("Stream is recorded: {}", message.object),

            ControlType::ClearStream
            | ControlType::ClearBuffer
            | ControlType::StreamDry
            | ControlType::BufferEmpty
            | ControlType::BufferReady => (),

            other => warn!("Received unknown or unhandled control {}", other),
        }
    }

    fn handle_server_bandwidth(&mut self, payload: &[u8]) {
        match messages::deserialize_server_bandwidth(payload) {
            Ok(bandwidth) => {
                debug!("Server bandwidth is {}", bandwidth);
                self.server_bandwidth = bandwidth;
            }

            Err(x) => error!("Invalid server bandwidth packet: {}", x),
        }
    }

    fn handle_client_bandwidth(&mut self, payload: &[u8]) {
        match messages::deserialize_client_bandwidth(payload) {
            Ok(client) => {
                self.bandwidth = client.bandwidth;
                self.bandwidth_limit_type = client.limit_type;
                debug!("Client bandwidth is {} {}", client.bandwidth, client.limit_type);
            }

            Err(x) => error!("Invalid client bandwidth packet: {}", x),
        }
    }

    fn send_bytes_received(&mut self) -> Result<(), SessionError> {
        let payload = messages::serialize_bytes_read(self.bytes_in as u32);
        self.bytes_in_sent = self.bytes_in;
        self.send_packet(Packet::new(CHANNEL_CONTROL1, PacketType::BytesRead, &payload))
    }
}

/// Splits an `rtmp://host[:port]/app` url into the host and port to connect to
fn parse_url(url: &str, default_port: u16) -> Result<(String, u16), SessionError> {
    let invalid = |reason: &str| SessionError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(url).map_err(|x| invalid(&x.to_string()))?;
    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => host.trim_start_matches('[').trim_end_matches(']'),
        _ => return Err(invalid("no host")),
    };

    let port = parsed.port().unwrap_or(default_port);
    Ok((host.to_string(), port))
}
