use super::ChunkWriteError;
use crate::byte_order::{encode_int24, encode_int32_le, encode_network_long};
use crate::packet::{HeaderType, PacketHeader, PacketType, EXTENDED_TIMESTAMP_SENTINEL};
use crate::time::timestamp_delta;

/// Longest possible header: a large header, a two byte channel extension and an extended
/// timestamp
pub const MAX_HEADER_LENGTH: usize = 12 + 2 + 4;

/// Largest channel number the two byte extension can express
pub const MAX_CHANNEL: u32 = 65599;

const MAX_DATA_SIZE: usize = 0x00ff_ffff;

/// Number of extension bytes the basic header needs for `channel`
pub fn channel_extension_length(channel: u32) -> usize {
    if channel > 319 {
        2
    } else if channel > 63 {
        1
    } else {
        0
    }
}

/// Picks the smallest header able to describe a message sent at `uptime`, given the header of the
/// last message sent on the same channel.
///
/// Returns the header type and the value of its timestamp field: an absolute timestamp for large
/// headers, a delta from the previous timestamp for every other type.
///
/// ```
/// use rtmp_client::chunk_io::select_header_type;
/// use rtmp_client::packet::{HeaderType, PacketHeader, PacketType};
///
/// let mut previous = PacketHeader::new(8, PacketType::Audio);
/// previous.timestamp = 1000;
/// previous.data_size = 64;
///
/// let selected = select_header_type(Some(&previous), 1020, 64, PacketType::Audio);
/// assert_eq!(selected, (HeaderType::Small, 20));
/// ```
pub fn select_header_type(
    previous: Option<&PacketHeader>,
    uptime: u32,
    data_size: usize,
    packet_type: PacketType,
) -> (HeaderType, u32) {
    let previous = match previous {
        Some(x) => x,
        None => return (HeaderType::Large, uptime),
    };

    if uptime < previous.timestamp {
        return (HeaderType::Large, uptime);
    }

    let delta = timestamp_delta(uptime, previous.timestamp);
    if delta >= EXTENDED_TIMESTAMP_SENTINEL {
        return (HeaderType::Large, uptime);
    }

    if previous.data_size != data_size || previous.packet_type != packet_type {
        return (HeaderType::Medium, delta);
    }

    if delta == 0 {
        (HeaderType::Minimum, delta)
    } else {
        (HeaderType::Small, delta)
    }
}

/// A chunk header ready to be written to the transport
#[derive(Clone, Copy)]
pub struct EncodedHeader {
    bytes: [u8; MAX_HEADER_LENGTH],
    length: usize,
}

impl EncodedHeader {
    fn new() -> EncodedHeader {
        EncodedHeader {
            bytes: [0; MAX_HEADER_LENGTH],
            length: 0,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.length]
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn put_u8(&mut self, value: u8) -> Result<(), ChunkWriteError> {
        let slot = self
            .bytes
            .get_mut(self.length)
            .ok_or(ChunkWriteError::HeaderOverrun)?;

        *slot = value;
        self.length += 1;
        Ok(())
    }

    fn put_with<F>(&mut self, encode: F) -> Result<(), ChunkWriteError>
    where
        F: FnOnce(&mut [u8]) -> Option<usize>,
    {
        let written = encode(&mut self.bytes[self.length..]).ok_or(ChunkWriteError::HeaderOverrun)?;
        self.length += written;
        Ok(())
    }

    fn put_basic_header(&mut self, header_type: HeaderType, channel: u32) -> Result<(), ChunkWriteError> {
        if channel < 2 {
            return Err(ChunkWriteError::ReservedChannel { channel });
        }

        if channel > MAX_CHANNEL {
            return Err(ChunkWriteError::ChannelOutOfRange { channel });
        }

        let flag = header_type.id() << 6;
        let extension = channel.wrapping_sub(64);
        match channel_extension_length(channel) {
            0 => self.put_u8(flag | channel as u8),
            1 => {
                self.put_u8(flag)?;
                self.put_u8(extension as u8)
            }

            _ => {
                self.put_u8(flag | 1)?;
                self.put_u8((extension & 0xff) as u8)?;
                self.put_u8((extension >> 8) as u8)
            }
        }
    }
}

impl std::fmt::Debug for EncodedHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "EncodedHeader({:02x?})", self.as_slice())
    }
}

/// Encodes the chunk header of the first chunk of a message.
///
/// `header.timestamp` must hold the field value chosen by `select_header_type`.  Only the fields
/// present for `header.header_type` are written.  A large header whose timestamp does not fit in
/// 24 bits carries the sentinel followed by the full timestamp in 4 extra bytes.
pub fn encode_header(header: &PacketHeader) -> Result<EncodedHeader, ChunkWriteError> {
    if header.data_size > MAX_DATA_SIZE {
        return Err(ChunkWriteError::MessageTooLarge {
            size: header.data_size,
        });
    }

    let mut encoded = EncodedHeader::new();
    encoded.put_basic_header(header.header_type, header.channel)?;

    let is_large = header.header_type == HeaderType::Large;
    let extended_timestamp = is_large && header.timestamp >= EXTENDED_TIMESTAMP_SENTINEL;

    if extended_timestamp {
        encoded.put_with(|x| encode_int24(x, EXTENDED_TIMESTAMP_SENTINEL))?;
    } else if header.header_type != HeaderType::Minimum {
        encoded.put_with(|x| encode_int24(x, header.timestamp))?;
    }

    if header.header_type.size() > 4 {
        encoded.put_with(|x| encode_int24(x, header.data_size as u32))?;
        encoded.put_u8(header.packet_type.to_u8())?;
    }

    if is_large {
        encoded.put_with(|x| encode_int32_le(x, header.stream_id as i32))?;
    }

    if extended_timestamp {
        encoded.put_with(|x| encode_network_long(x, header.timestamp))?;
    }

    Ok(encoded)
}

/// The one byte (plus channel extension) header preceding every chunk after the first one of a
/// message
pub fn continuation_header(channel: u32) -> Result<EncodedHeader, ChunkWriteError> {
    let mut encoded = EncodedHeader::new();
    encoded.put_basic_header(HeaderType::Minimum, channel)?;
    Ok(encoded)
}
