//! This crate provides the subset of Adobe's AMF0 encoding that RTMP invoke messages carry:
//! numbers, booleans, strings, null/undefined markers and anonymous objects.
//! (<https://wwwimages2.adobe.com/content/dam/acom/en/devnet/pdf/amf0-file-format-specification.pdf>)
//!
//! # Examples
//! ```
//! use std::io::Cursor;
//! use rtmp_amf0::{Amf0Value, serialize, deserialize};
//!
//! let command_object = Amf0Value::Object(vec![
//!     ("app".to_string(), Amf0Value::Utf8String("live".to_string())),
//!     ("fpad".to_string(), Amf0Value::Boolean(false)),
//! ]);
//!
//! let input = vec![
//!     Amf0Value::Utf8String("connect".to_string()),
//!     Amf0Value::Number(1.0),
//!     command_object,
//! ];
//!
//! let serialized_data = serialize(&input).unwrap();
//!
//! let mut serialized_cursor = Cursor::new(serialized_data);
//! let results = deserialize(&mut serialized_cursor).unwrap();
//!
//! assert_eq!(input, results);
//! ```
//!
//! The name of an invoked remote method can be peeked at without decoding the whole payload:
//!
//! ```
//! use rtmp_amf0::{Amf0Value, read_string, serialize};
//!
//! let payload = serialize(&vec![Amf0Value::Utf8String("createStream".to_string())]).unwrap();
//! assert_eq!(read_string(&payload).unwrap(), "createStream");
//! ```

mod deserialization;
mod errors;
mod serialization;

pub use crate::deserialization::{deserialize, read_string};
pub use crate::errors::{Amf0DeserializationError, Amf0SerializationError};
pub use crate::serialization::serialize;

/// An Enum representing the different supported types of Amf0 values
///
/// Object properties are kept in the order they were added (or read), since some servers
/// expect the properties of a `connect` command object in a specific order.
#[derive(PartialEq, Debug, Clone)]
pub enum Amf0Value {
    Number(f64),
    Boolean(bool),
    Utf8String(String),
    Object(Vec<(String, Amf0Value)>),
    Null,
    Undefined,
}

impl Amf0Value {
    pub fn get_number(self) -> Option<f64> {
        match self {
            Amf0Value::Number(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_string(self) -> Option<String> {
        match self {
            Amf0Value::Utf8String(value) => Some(value),
            _ => None,
        }
    }

    /// Looks up a property of an object value by name
    pub fn property(&self, name: &str) -> Option<&Amf0Value> {
        match self {
            Amf0Value::Object(properties) => properties
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

pub(crate) mod markers {
    pub const NUMBER_MARKER: u8 = 0;
    pub const BOOLEAN_MARKER: u8 = 1;
    pub const STRING_MARKER: u8 = 2;
    pub const OBJECT_MARKER: u8 = 3;
    pub const NULL_MARKER: u8 = 5;
    pub const UNDEFINED_MARKER: u8 = 6;
    pub const ECMA_ARRAY_MARKER: u8 = 8;
    pub const OBJECT_END_MARKER: u8 = 9;
    pub const UTF_8_EMPTY_MARKER: u16 = 0;
}
