use thiserror::Error;

/// Fatal conditions encountered while performing the handshake
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The transport accepted some, but not all, of a handshake packet.  The peer will never be
    /// able to make sense of what follows.
    #[error("Only {sent} of the {expected} bytes of handshake stage {stage} could be sent")]
    IncompleteWrite {
        stage: u8,
        sent: usize,
        expected: usize,
    },

    /// The transport returned part of a handshake packet, which it promised never to do
    #[error("Only {read} of the {expected} bytes of handshake stage {stage} were read")]
    IncompleteRead {
        stage: u8,
        read: usize,
        expected: usize,
    },
}
