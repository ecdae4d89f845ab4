//! The in-memory representation of RTMP messages.
//!
//! A `Packet` serves two purposes.  While a message is being received it accumulates the
//! payload of every chunk until `data_size` bytes have been read.  Once a message has been
//! handled, a copy of its header is kept per channel (without a payload) so the next header on
//! that channel can be decoded or compressed against it.  Only those stored, header-only packets
//! lack a payload buffer.

mod channels;
mod header;

pub use self::channels::{ChannelStore, Direction};
pub use self::header::{HeaderType, PacketHeader, PacketType};
pub use self::header::{CHANNEL_CONTROL1, CHANNEL_CONTROL2, CHANNEL_VIDEO};
pub use self::header::{EXTENDED_TIMESTAMP_SENTINEL, HEADER_SIZES};

use bytes::BytesMut;

#[derive(PartialEq, Debug, Clone)]
pub struct Packet {
    pub header: PacketHeader,
    payload: Option<BytesMut>,

    /// How much of `header.data_size` has been received so far
    pub bytes_read: usize,
}

impl Packet {
    /// Creates an outgoing packet carrying a copy of `data`.  The data size is taken from the
    /// payload when the packet is sent.
    pub fn new(channel: u32, packet_type: PacketType, data: &[u8]) -> Packet {
        let mut payload = BytesMut::with_capacity(data.len());
        payload.extend_from_slice(data);

        Packet {
            header: PacketHeader::new(channel, packet_type),
            payload: Some(payload),
            bytes_read: 0,
        }
    }

    /// Creates a packet that only carries header information
    pub fn header_only(header: PacketHeader) -> Packet {
        Packet {
            header,
            payload: None,
            bytes_read: 0,
        }
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Drops the payload and the read progress, keeping only the header
    pub fn clear_payload(&mut self) {
        self.payload = None;
        self.bytes_read = 0;
    }

    /// Allocates a zeroed payload buffer of `header.data_size` bytes if the packet has none,
    /// otherwise resizes the existing buffer in place.
    pub fn allocate_payload(&mut self) {
        let size = self.header.data_size;
        match self.payload {
            Some(ref mut payload) => payload.resize(size, 0),
            None => {
                let mut payload = BytesMut::with_capacity(size);
                payload.resize(size, 0);
                self.payload = Some(payload);
            }
        }
    }

    /// The payload bytes, or `None` for a header-only packet.
    ///
    /// For a packet still being received this includes the space not yet filled.
    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_ref().map(|x| &x[..])
    }

    pub(crate) fn payload_mut(&mut self) -> Option<&mut [u8]> {
        self.payload.as_mut().map(|x| &mut x[..])
    }

    /// Size of the payload buffer, 0 for header-only packets
    pub fn payload_size(&self) -> usize {
        self.payload.as_ref().map_or(0, |x| x.len())
    }

    /// A packet is ready once its whole payload has been received
    pub fn is_ready(&self) -> bool {
        self.bytes_read == self.header.data_size
    }

    /// Moves the payload and read progress out of this packet into a new packet with the same
    /// header.  This packet is left header-only.
    pub fn detach(&mut self) -> Packet {
        let detached = Packet {
            header: self.header.clone(),
            payload: self.payload.take(),
            bytes_read: self.bytes_read,
        };

        self.bytes_read = 0;
        detached
    }
}
