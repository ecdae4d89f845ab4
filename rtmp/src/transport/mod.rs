//! The byte stream an `RtmpSession` runs over.
//!
//! Sessions never block on their transport.  A read either returns everything that was asked
//! for or nothing at all, so a session can always retry the same read on its next `update()`.

mod memory;
mod tcp;

pub use self::memory::MemoryTransport;
pub use self::tcp::{TcpTransport, DEFAULT_SEND_QUEUE_LIMIT};

use std::io;

pub trait Transport {
    /// Opens the connection to `host:port`
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()>;

    /// Fills `buffer` completely and returns its length, or consumes nothing and returns 0 if
    /// fewer bytes than `buffer.len()` are available right now.
    fn read(&mut self, buffer: &mut [u8]) -> usize;

    /// Queues `data` for sending and returns how many bytes were accepted
    fn write(&mut self, data: &[u8]) -> usize;

    fn connected(&self) -> bool;

    /// True once the transport has failed in a way it cannot recover from
    fn bad(&self) -> bool;

    /// True once the peer has closed its side and every received byte has been read
    fn eof(&self) -> bool;

    fn close(&mut self);
}
