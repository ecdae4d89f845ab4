use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use super::{ensure_length, MessageError};

/// Limit type reported when a client bandwidth message carries none
pub const NO_LIMIT_TYPE: u8 = 0xff;

/// Contents of a client bandwidth message
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct ClientBandwidth {
    pub bandwidth: u32,

    /// The optional byte after the bandwidth, `NO_LIMIT_TYPE` if absent
    pub limit_type: u8,
}

fn network_long(value: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(4);
    let _ = bytes.write_u32::<BigEndian>(value);
    bytes
}

pub fn serialize_chunk_size(size: u32) -> Vec<u8> {
    network_long(size)
}

pub fn deserialize_chunk_size(payload: &[u8]) -> Result<u32, MessageError> {
    ensure_length("Chunk size", payload, 4)?;
    Ok(Cursor::new(payload).read_u32::<BigEndian>()?)
}

/// Acknowledges the total number of bytes received so far
pub fn serialize_bytes_read(total: u32) -> Vec<u8> {
    network_long(total)
}

pub fn serialize_server_bandwidth(bandwidth: u32) -> Vec<u8> {
    network_long(bandwidth)
}

pub fn deserialize_server_bandwidth(payload: &[u8]) -> Result<u32, MessageError> {
    ensure_length("Server bandwidth", payload, 4)?;
    Ok(Cursor::new(payload).read_u32::<BigEndian>()?)
}

pub fn deserialize_client_bandwidth(payload: &[u8]) -> Result<ClientBandwidth, MessageError> {
    ensure_length("Client bandwidth", payload, 4)?;

    let mut cursor = Cursor::new(payload);
    let bandwidth = cursor.read_u32::<BigEndian>()?;
    let limit_type = match payload.len() {
        4 => NO_LIMIT_TYPE,
        _ => cursor.read_u8()?,
    };

    Ok(ClientBandwidth {
        bandwidth,
        limit_type,
    })
}
