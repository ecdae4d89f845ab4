use thiserror::Error;

use std::io;

/// Errors raised while reading the payload of a control message
#[derive(Debug, Error)]
pub enum MessageError {
    /// The payload is shorter than the fields the message type requires
    #[error("{message} payload requires at least {expected} bytes but only {actual} were received")]
    PayloadTooShort {
        message: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Failed to read the values from the payload
    #[error("An IO error occurred while reading the payload: {0}")]
    Io(#[from] io::Error),
}
