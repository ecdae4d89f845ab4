use crate::chunk_io::ChunkWriteError;
use thiserror::Error;

use std::io;

/// Errors returned by the operations of an `RtmpSession`
#[derive(Debug, Error)]
pub enum SessionError {
    /// The url could not be parsed or has no host
    #[error("Invalid rtmp url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The transport could not open a connection
    #[error("Initial connection failed: {0}")]
    ConnectionFailed(#[from] io::Error),

    /// A message was sent while the transport is not connected
    #[error("The session is not connected")]
    NotConnected,

    /// The transport accepted only part of a message.  The peer will not be able to decode
    /// anything sent afterwards.
    #[error("Only {written} of {expected} bytes of the message could be written")]
    IncompleteWrite { written: usize, expected: usize },

    /// Encountered when an error occurs while encoding an outgoing chunk header
    #[error("An error occurred encoding an outgoing chunk header: {0}")]
    ChunkWrite(#[from] ChunkWriteError),

    /// Chunk sizes must be between 1 and 2147483647
    #[error("Requested an invalid chunk size of {size}")]
    InvalidChunkSize { size: u32 },
}
