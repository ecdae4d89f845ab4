/// Chunk size both sides start with, until one announces another
pub const DEFAULT_CHUNK_SIZE: usize = 128;

pub const DEFAULT_PORT: u16 = 1935;

pub const DEFAULT_BANDWIDTH: u32 = 2_500_000;

/// Configuration options that govern how an RTMP session should operate
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Port used when the url does not name one
    pub default_port: u16,

    /// Outgoing chunk size.  Anything other than the default is announced to the peer as soon as
    /// the handshake completes.
    pub chunk_size: u32,

    /// Maximum number of chunk reads performed by a single `update()` call
    pub reads_per_update: usize,

    /// Client bandwidth assumed until the peer announces one
    pub bandwidth: u32,

    /// Server bandwidth assumed until the peer announces one
    pub server_bandwidth: u32,
}

impl SessionConfig {
    /// Creates a new configuration object with default values
    pub fn new() -> SessionConfig {
        SessionConfig {
            default_port: DEFAULT_PORT,
            chunk_size: DEFAULT_CHUNK_SIZE as u32,
            reads_per_update: 10,
            bandwidth: DEFAULT_BANDWIDTH,
            server_bandwidth: DEFAULT_BANDWIDTH,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig::new()
    }
}
