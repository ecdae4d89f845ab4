//! Encoding and decoding of RTMP chunk headers.
//!
//! Every chunk starts with a basic header holding the header type in its top two bits and the
//! channel number in the remaining six.  Channel values 0 and 1 are not channel numbers but
//! announce that one or two extra bytes follow (channels 64 to 319 and 320 to 65599
//! respectively).
//!
//! The header type decides which message fields follow.  Fields that are left out are taken
//! from the previous message on the same channel, which is how a steady stream of similar
//! messages ends up costing a single header byte per chunk.

mod errors;
mod reader;
mod writer;

pub use self::errors::{ChunkReadError, ChunkWriteError};
pub use self::reader::{decode_header, header_length, BasicHeader};
pub use self::writer::{
    channel_extension_length, continuation_header, encode_header, select_header_type,
    EncodedHeader, MAX_CHANNEL, MAX_HEADER_LENGTH,
};
