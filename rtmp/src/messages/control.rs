use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::Cursor;

use super::{ensure_length, MessageError};

/// Sub-types of control messages
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ControlType {
    ClearStream,
    ClearBuffer,
    StreamDry,
    BufferTime,
    ResetStream,
    Ping,
    Pong,
    RequestVerify,
    RespondVerify,
    BufferEmpty,
    BufferReady,
    Unknown(u16),
}

impl ControlType {
    pub fn to_u16(self) -> u16 {
        match self {
            ControlType::ClearStream => 0x00,
            ControlType::ClearBuffer => 0x01,
            ControlType::StreamDry => 0x02,
            ControlType::BufferTime => 0x03,
            ControlType::ResetStream => 0x04,
            ControlType::Ping => 0x06,
            ControlType::Pong => 0x07,
            ControlType::RequestVerify => 0x1a,
            ControlType::RespondVerify => 0x1b,
            ControlType::BufferEmpty => 0x1f,
            ControlType::BufferReady => 0x20,
            ControlType::Unknown(x) => x,
        }
    }
}

impl From<u16> for ControlType {
    fn from(value: u16) -> Self {
        match value {
            0x00 => ControlType::ClearStream,
            0x01 => ControlType::ClearBuffer,
            0x02 => ControlType::StreamDry,
            0x03 => ControlType::BufferTime,
            0x04 => ControlType::ResetStream,
            0x06 => ControlType::Ping,
            0x07 => ControlType::Pong,
            0x1a => ControlType::RequestVerify,
            0x1b => ControlType::RespondVerify,
            0x1f => ControlType::BufferEmpty,
            0x20 => ControlType::BufferReady,
            x => ControlType::Unknown(x),
        }
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ControlType::ClearStream => write!(f, "<clear stream>"),
            ControlType::ClearBuffer => write!(f, "<clear buffer>"),
            ControlType::StreamDry => write!(f, "<stream dry>"),
            ControlType::BufferTime => write!(f, "<buffer time>"),
            ControlType::ResetStream => write!(f, "<reset stream>"),
            ControlType::Ping => write!(f, "<ping>"),
            ControlType::Pong => write!(f, "<pong>"),
            ControlType::RequestVerify => write!(f, "<request verify>"),
            ControlType::RespondVerify => write!(f, "<respond verify>"),
            ControlType::BufferEmpty => write!(f, "<buffer empty>"),
            ControlType::BufferReady => write!(f, "<buffer ready>"),
            ControlType::Unknown(x) => write!(f, "<unknown control {}>", x),
        }
    }
}

/// A control message: a type, the object (usually a stream id or a ping time) it applies to and,
/// for buffer time messages, the buffer length in milliseconds.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct ControlMessage {
    pub control_type: ControlType,
    pub object: u32,
    pub time: Option<u32>,
}

impl ControlMessage {
    pub fn new(control_type: ControlType, object: u32, time: u32) -> ControlMessage {
        ControlMessage {
            control_type,
            object,
            time: match control_type {
                ControlType::BufferTime => Some(time),
                _ => None,
            },
        }
    }

    /// Writes the message as 6 bytes, or 10 bytes for buffer time messages
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(10);

        // Writes into a Vec cannot fail
        let _ = bytes.write_u16::<BigEndian>(self.control_type.to_u16());
        let _ = bytes.write_u32::<BigEndian>(self.object);
        if self.control_type == ControlType::BufferTime {
            let _ = bytes.write_u32::<BigEndian>(self.time.unwrap_or(0));
        }

        bytes
    }

    pub fn deserialize(payload: &[u8]) -> Result<ControlMessage, MessageError> {
        ensure_length("Control", payload, 6)?;

        let mut cursor = Cursor::new(payload);
        let control_type = ControlType::from(cursor.read_u16::<BigEndian>()?);
        let object = cursor.read_u32::<BigEndian>()?;
        let time = match control_type {
            ControlType::BufferTime if payload.len() >= 10 => Some(cursor.read_u32::<BigEndian>()?),
            _ => None,
        };

        Ok(ControlMessage {
            control_type,
            object,
            time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_serialize_ping_response() {
        let bytes = ControlMessage::new(ControlType::Pong, 5521, 0).serialize();

        let mut expected = Cursor::new(Vec::new());
        expected.write_u16::<BigEndian>(7).unwrap();
        expected.write_u32::<BigEndian>(5521).unwrap();

        assert_eq!(bytes, expected.into_inner());
    }

    #[test]
    fn buffer_time_carries_the_time_field() {
        let bytes = ControlMessage::new(ControlType::BufferTime, 1, 3000).serialize();

        let mut expected = Cursor::new(Vec::new());
        expected.write_u16::<BigEndian>(3).unwrap();
        expected.write_u32::<BigEndian>(1).unwrap();
        expected.write_u32::<BigEndian>(3000).unwrap();

        assert_eq!(bytes, expected.into_inner());
    }

    #[test]
    fn can_deserialize_ping_request() {
        let mut payload = Cursor::new(Vec::new());
        payload.write_u16::<BigEndian>(6).unwrap();
        payload.write_u32::<BigEndian>(1234).unwrap();

        let message = ControlMessage::deserialize(&payload.into_inner()).unwrap();

        assert_eq!(message.control_type, ControlType::Ping);
        assert_eq!(message.object, 1234);
        assert_eq!(message.time, None);
    }

    #[test]
    fn unknown_control_types_are_kept() {
        let message = ControlMessage::deserialize(&[0, 0x44, 0, 0, 0, 1]).unwrap();

        assert_eq!(message.control_type, ControlType::Unknown(0x44));
        assert_eq!(message.control_type.to_string(), "<unknown control 68>");
    }

    #[test]
    fn short_payload_is_rejected() {
        match ControlMessage::deserialize(&[0, 6, 0]) {
            Err(MessageError::PayloadTooShort { expected: 6, actual: 3, .. }) => (),
            x => panic!("Expected PayloadTooShort, received {:?}", x),
        }
    }
}
