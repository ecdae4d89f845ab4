use std::fmt;

/// Channel used for protocol control: control events, bandwidth and bytes-read reports.
/// Messages on it carry no AMF data.
pub const CHANNEL_CONTROL1: u32 = 0x02;

/// Channel used for ActionScript level requests (`connect`, `createStream`, `_result` ...)
pub const CHANNEL_CONTROL2: u32 = 0x03;

/// Channel used for NetStream requests and media
pub const CHANNEL_VIDEO: u32 = 0x08;

/// Size in bytes of each header type on the wire, indexed by the 2 bit header type.  The count
/// includes the first byte but not any channel extension or extended timestamp bytes.
pub const HEADER_SIZES: [usize; 4] = [12, 8, 4, 1];

/// The value of the 3 byte timestamp field announcing that a 4 byte extended timestamp follows
pub const EXTENDED_TIMESTAMP_SENTINEL: u32 = 0x00ff_ffff;

/// Which of the header fields are physically present in a chunk.  Fields that are missing are
/// inherited from the last packet seen on the same channel.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum HeaderType {
    /// All fields, with an absolute timestamp.  Expected for the first packet on any channel.
    Large,

    /// Timestamp delta, data size and packet type.  The stream id is inherited.
    Medium,

    /// Timestamp delta only
    Small,

    /// No fields at all
    Minimum,
}

impl HeaderType {
    /// Reads the header type out of the top 2 bits of the first header byte
    pub fn from_flag_byte(byte: u8) -> HeaderType {
        match (byte & 0xc0) >> 6 {
            0 => HeaderType::Large,
            1 => HeaderType::Medium,
            2 => HeaderType::Small,
            _ => HeaderType::Minimum,
        }
    }

    /// The 2 bit value of the header type
    pub fn id(self) -> u8 {
        match self {
            HeaderType::Large => 0,
            HeaderType::Medium => 1,
            HeaderType::Small => 2,
            HeaderType::Minimum => 3,
        }
    }

    /// The number of bytes this header type occupies, including the first byte
    pub fn size(self) -> usize {
        HEADER_SIZES[self.id() as usize]
    }
}

/// The known message types
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum PacketType {
    None,
    ChunkSize,
    BytesRead,
    Control,
    ServerBandwidth,
    ClientBandwidth,
    Audio,
    Video,
    FlexStreamSend,
    FlexSharedObject,
    FlexMessage,
    Metadata,
    SharedObject,
    Invoke,
    Flv,
    Unknown(u8),
}

impl PacketType {
    pub fn to_u8(self) -> u8 {
        match self {
            PacketType::None => 0x00,
            PacketType::ChunkSize => 0x01,
            PacketType::BytesRead => 0x03,
            PacketType::Control => 0x04,
            PacketType::ServerBandwidth => 0x05,
            PacketType::ClientBandwidth => 0x06,
            PacketType::Audio => 0x08,
            PacketType::Video => 0x09,
            PacketType::FlexStreamSend => 0x0f,
            PacketType::FlexSharedObject => 0x10,
            PacketType::FlexMessage => 0x11,
            PacketType::Metadata => 0x12,
            PacketType::SharedObject => 0x13,
            PacketType::Invoke => 0x14,
            PacketType::Flv => 0x16,
            PacketType::Unknown(x) => x,
        }
    }
}

impl From<u8> for PacketType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => PacketType::None,
            0x01 => PacketType::ChunkSize,
            0x03 => PacketType::BytesRead,
            0x04 => PacketType::Control,
            0x05 => PacketType::ServerBandwidth,
            0x06 => PacketType::ClientBandwidth,
            0x08 => PacketType::Audio,
            0x09 => PacketType::Video,
            0x0f => PacketType::FlexStreamSend,
            0x10 => PacketType::FlexSharedObject,
            0x11 => PacketType::FlexMessage,
            0x12 => PacketType::Metadata,
            0x13 => PacketType::SharedObject,
            0x14 => PacketType::Invoke,
            0x16 => PacketType::Flv,
            x => PacketType::Unknown(x),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PacketType::None => write!(f, "<no packet type>"),
            PacketType::ChunkSize => write!(f, "<chunk size packet>"),
            PacketType::BytesRead => write!(f, "<bytes read packet>"),
            PacketType::Control => write!(f, "<control packet>"),
            PacketType::ServerBandwidth => write!(f, "<server bw packet>"),
            PacketType::ClientBandwidth => write!(f, "<client bw packet>"),
            PacketType::Audio => write!(f, "<audio packet>"),
            PacketType::Video => write!(f, "<video packet>"),
            PacketType::FlexStreamSend => write!(f, "<flex stream send packet>"),
            PacketType::FlexSharedObject => write!(f, "<flex sharedobject packet>"),
            PacketType::FlexMessage => write!(f, "<flex message packet>"),
            PacketType::Metadata => write!(f, "<metadata packet>"),
            PacketType::SharedObject => write!(f, "<sharedobject packet>"),
            PacketType::Invoke => write!(f, "<invoke packet>"),
            PacketType::Flv => write!(f, "<flv packet>"),
            PacketType::Unknown(x) => write!(f, "<unknown packet type {}>", x),
        }
    }
}

/// All the header fields of one logical message
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PacketHeader {
    pub header_type: HeaderType,
    pub packet_type: PacketType,

    /// Absolute timestamp once decoded.  While a packet is being encoded this may temporarily
    /// hold a delta, but stored packets always hold the absolute value.
    pub timestamp: u32,

    /// Message stream id, used for NetStream messages
    pub stream_id: u32,

    pub channel: u32,

    /// Size of the complete message payload, not of a single chunk
    pub data_size: usize,
}

impl PacketHeader {
    pub fn new(channel: u32, packet_type: PacketType) -> PacketHeader {
        PacketHeader {
            header_type: HeaderType::Large,
            packet_type,
            timestamp: 0,
            stream_id: 0,
            channel,
            data_size: 0,
        }
    }
}

impl Default for PacketHeader {
    fn default() -> Self {
        PacketHeader::new(0, PacketType::None)
    }
}
