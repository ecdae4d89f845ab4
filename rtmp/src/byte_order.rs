//! Integer encodings used by RTMP chunk headers.
//!
//! Every multi-byte header field is big-endian except the message stream id, which is sent
//! little-endian.  Peers depend on that asymmetry so it must be kept as is.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Decodes a big-endian 24 bit unsigned integer from the first three bytes of `bytes`
pub fn decode_int24(bytes: &[u8]) -> u32 {
    BigEndian::read_u24(bytes)
}

/// Writes `value` as a big-endian 24 bit integer at the start of `output`.
///
/// Returns the number of bytes written, or `None` if `output` is too small to hold them.  Only
/// the low 24 bits of `value` are written.
pub fn encode_int24(output: &mut [u8], value: u32) -> Option<usize> {
    if output.len() < 3 {
        return None;
    }

    BigEndian::write_u24(output, value & 0x00ff_ffff);
    Some(3)
}

/// Decodes a little-endian 32 bit integer (the message stream id field)
pub fn decode_int32_le(bytes: &[u8]) -> i32 {
    LittleEndian::read_i32(bytes)
}

/// Writes `value` little-endian at the start of `output`
pub fn encode_int32_le(output: &mut [u8], value: i32) -> Option<usize> {
    if output.len() < 4 {
        return None;
    }

    LittleEndian::write_i32(output, value);
    Some(4)
}

/// Reads a network order (big-endian) 16 bit integer
pub fn read_network_short(bytes: &[u8]) -> u16 {
    BigEndian::read_u16(bytes)
}

/// Reads a network order (big-endian) 32 bit integer
pub fn read_network_long(bytes: &[u8]) -> u32 {
    BigEndian::read_u32(bytes)
}

/// Writes a network order (big-endian) 32 bit integer at the start of `output`
pub fn encode_network_long(output: &mut [u8], value: u32) -> Option<usize> {
    if output.len() < 4 {
        return None;
    }

    BigEndian::write_u32(output, value);
    Some(4)
}
