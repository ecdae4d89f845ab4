//! Payloads of the messages the session handles itself.
//!
//! Every value in these payloads is a big-endian integer.  Messages carrying AMF data (invokes,
//! FLV tags, metadata) are passed to the caller untouched and are not described here.

mod control;
mod errors;
mod protocol_control;

pub use self::control::{ControlMessage, ControlType};
pub use self::errors::MessageError;
pub use self::protocol_control::{
    deserialize_chunk_size, deserialize_client_bandwidth, deserialize_server_bandwidth,
    serialize_bytes_read, serialize_chunk_size, serialize_server_bandwidth, ClientBandwidth,
    NO_LIMIT_TYPE,
};

fn ensure_length(message: &'static str, payload: &[u8], expected: usize) -> Result<(), MessageError> {
    if payload.len() < expected {
        return Err(MessageError::PayloadTooShort {
            message,
            expected,
            actual: payload.len(),
        });
    }

    Ok(())
}
