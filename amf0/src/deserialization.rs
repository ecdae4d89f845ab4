//! Deserializes values from bytes that were encoded via the AMF0 specification

use crate::errors::Amf0DeserializationError;
use crate::markers;
use crate::Amf0Value;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// Reads every value out of a byte stream until it is exhausted
pub fn deserialize<R: Read>(bytes: &mut R) -> Result<Vec<Amf0Value>, Amf0DeserializationError> {
    let mut results = vec![];

    while let Some(value) = read_next_value(bytes)? {
        results.push(value);
    }

    Ok(results)
}

/// Reads the string value at the start of `bytes`.
///
/// Invoke payloads always start with the name of the remote method, so this allows the name to
/// be inspected without decoding the rest of the message.
pub fn read_string(bytes: &[u8]) -> Result<String, Amf0DeserializationError> {
    let mut cursor = Cursor::new(bytes);
    let marker = match cursor.read_u8() {
        Ok(x) => x,
        Err(_) => return Err(Amf0DeserializationError::UnexpectedEof),
    };

    if marker != markers::STRING_MARKER {
        return Err(Amf0DeserializationError::NotAString { marker });
    }

    read_utf8(&mut cursor)
}

fn read_next_value<R: Read>(bytes: &mut R) -> Result<Option<Amf0Value>, Amf0DeserializationError> {
    let mut buffer: [u8; 1] = [0];
    let bytes_read = bytes.read(&mut buffer)?;

    if bytes_read == 0 {
        return Ok(None);
    }

    match buffer[0] {
        markers::BOOLEAN_MARKER => Ok(Some(Amf0Value::Boolean(bytes.read_u8()? == 1))),
        markers::NULL_MARKER => Ok(Some(Amf0Value::Null)),
        markers::UNDEFINED_MARKER => Ok(Some(Amf0Value::Undefined)),
        markers::NUMBER_MARKER => Ok(Some(Amf0Value::Number(bytes.read_f64::<BigEndian>()?))),
        markers::STRING_MARKER => Ok(Some(Amf0Value::Utf8String(read_utf8(bytes)?))),
        markers::OBJECT_MARKER => parse_object(bytes).map(Some),
        markers::ECMA_ARRAY_MARKER => {
            // The associative count is unreliable in practice, the array is terminated
            // the same way an object is.
            let _associative_count = bytes.read_u32::<BigEndian>()?;
            parse_object(bytes).map(Some)
        }
        marker => Err(Amf0DeserializationError::UnknownMarker { marker }),
    }
}

fn read_utf8<R: Read>(bytes: &mut R) -> Result<String, Amf0DeserializationError> {
    let length = bytes.read_u16::<BigEndian>()?;
    let mut buffer: Vec<u8> = vec![0_u8; length as usize];
    bytes.read_exact(&mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}

fn parse_object<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let mut properties = Vec::new();

    loop {
        let label = read_utf8(bytes)?;
        if label.is_empty() {
            if bytes.read_u8()? != markers::OBJECT_END_MARKER {
                return Err(Amf0DeserializationError::UnexpectedEmptyObjectPropertyName);
            }

            break;
        }

        match read_next_value(bytes)? {
            None => return Err(Amf0DeserializationError::UnexpectedEof),
            Some(value) => properties.push((label, value)),
        }
    }

    Ok(Amf0Value::Object(properties))
}
