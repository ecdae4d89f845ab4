use thiserror::Error;

/// Errors raised while decoding a chunk header received from the peer
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkReadError {
    /// Only a large header carries every field.  Any other header type relies on the previous
    /// message received on the same channel, so receiving one on a fresh channel means the
    /// stream can no longer be decoded.
    #[error("Received a compressed header on channel {channel} which has no previous packet")]
    NoPreviousPacketOnChannel { channel: u32 },

    /// Fewer bytes were supplied than the header declares
    #[error("Chunk header requires {expected} bytes but only {actual} were available")]
    IncompleteHeader { expected: usize, actual: usize },
}

/// Errors raised while encoding a chunk header
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkWriteError {
    /// Channel numbers 0 and 1 are escape codes for the extended channel encoding
    #[error("Channel {channel} is reserved and cannot be written to")]
    ReservedChannel { channel: u32 },

    /// The largest channel the two byte extension can express is 65599
    #[error("Channel {channel} is larger than the maximum of 65599")]
    ChannelOutOfRange { channel: u32 },

    /// The data size field only holds 24 bits
    #[error("Message of {size} bytes is too large to be sent")]
    MessageTooLarge { size: usize },

    /// The encoder attempted to write past the end of its header buffer
    #[error("Chunk header did not fit its buffer")]
    HeaderOverrun,
}
