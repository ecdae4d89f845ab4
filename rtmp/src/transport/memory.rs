use super::Transport;
use std::cell::RefCell;
use std::cmp::min;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Pipe {
    bytes: VecDeque<u8>,
    closed: bool,
}

/// One end of an in-memory connection.  Whatever one end writes, the other end reads.
///
/// ```
/// use rtmp_client::transport::{MemoryTransport, Transport};
///
/// let (mut a, mut b) = MemoryTransport::pair();
/// a.connect("localhost", 1935).unwrap();
/// b.connect("localhost", 1935).unwrap();
///
/// assert_eq!(a.write(&[1, 2, 3]), 3);
///
/// let mut buffer = [0_u8; 4];
/// assert_eq!(b.read(&mut buffer), 0, "Partial reads are refused");
///
/// let mut buffer = [0_u8; 3];
/// assert_eq!(b.read(&mut buffer), 3);
/// assert_eq!(buffer, [1, 2, 3]);
/// ```
#[derive(Debug)]
pub struct MemoryTransport {
    inbound: Rc<RefCell<Pipe>>,
    outbound: Rc<RefCell<Pipe>>,
    connected: bool,
    bad: bool,
    write_limit: Option<usize>,
}

impl MemoryTransport {
    /// Creates two connected ends
    pub fn pair() -> (MemoryTransport, MemoryTransport) {
        let a_to_b = Rc::new(RefCell::new(Pipe::default()));
        let b_to_a = Rc::new(RefCell::new(Pipe::default()));

        let a = MemoryTransport::from_pipes(b_to_a.clone(), a_to_b.clone());
        let b = MemoryTransport::from_pipes(a_to_b, b_to_a);
        (a, b)
    }

    fn from_pipes(inbound: Rc<RefCell<Pipe>>, outbound: Rc<RefCell<Pipe>>) -> MemoryTransport {
        MemoryTransport {
            inbound,
            outbound,
            connected: false,
            bad: false,
            write_limit: None,
        }
    }

    /// Number of bytes waiting to be read on this end
    pub fn available(&self) -> usize {
        self.inbound.borrow().bytes.len()
    }

    /// Caps how many bytes a single `write()` accepts, to simulate a congested connection
    pub fn set_write_limit(&mut self, limit: Option<usize>) {
        self.write_limit = limit;
    }

    /// Puts the transport into (or out of) a failed state
    pub fn set_bad(&mut self, bad: bool) {
        self.bad = bad;
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self, _host: &str, _port: u16) -> io::Result<()> {
        self.connected = true;
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> usize {
        if !self.connected || self.bad {
            return 0;
        }

        let count = buffer.len();
        let mut pipe = self.inbound.borrow_mut();
        if pipe.bytes.len() < count {
            return 0;
        }

        for (target, byte) in buffer.iter_mut().zip(pipe.bytes.drain(..count)) {
            *target = byte;
        }

        count
    }

    fn write(&mut self, data: &[u8]) -> usize {
        if !self.connected || self.bad {
            return 0;
        }

        let count = match self.write_limit {
            Some(limit) => min(limit, data.len()),
            None => data.len(),
        };

        self.outbound.borrow_mut().bytes.extend(&data[..count]);
        count
    }

    fn connected(&self) -> bool {
        self.connected
    }

    fn bad(&self) -> bool {
        self.bad
    }

    fn eof(&self) -> bool {
        let pipe = self.inbound.borrow();
        pipe.closed && pipe.bytes.is_empty()
    }

    fn close(&mut self) {
        self.connected = false;
        self.outbound.borrow_mut().closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_pair() -> (MemoryTransport, MemoryTransport) {
        let (mut a, mut b) = MemoryTransport::pair();
        a.connect("localhost", 1935).unwrap();
        b.connect("localhost", 1935).unwrap();
        (a, b)
    }

    #[test]
    fn bytes_flow_in_both_directions() {
        let (mut a, mut b) = connected_pair();
        a.write(&[1, 2]);
        b.write(&[3]);

        let mut buffer = [0_u8; 2];
        assert_eq!(b.read(&mut buffer), 2);
        assert_eq!(buffer, [1, 2]);

        let mut buffer = [0_u8; 1];
        assert_eq!(a.read(&mut buffer), 1);
        assert_eq!(buffer, [3]);
    }

    #[test]
    fn short_read_consumes_nothing() {
        let (mut a, mut b) = connected_pair();
        a.write(&[1, 2]);

        let mut buffer = [0_u8; 3];
        assert_eq!(b.read(&mut buffer), 0);
        assert_eq!(b.available(), 2);
    }

    #[test]
    fn write_limit_caps_accepted_bytes() {
        let (mut a, b) = connected_pair();
        a.set_write_limit(Some(2));

        assert_eq!(a.write(&[1, 2, 3]), 2);
        assert_eq!(b.available(), 2);
    }

    #[test]
    fn unconnected_transport_moves_no_bytes() {
        let (mut a, _b) = MemoryTransport::pair();
        assert_eq!(a.write(&[1]), 0);
    }

    #[test]
    fn closing_one_end_is_eof_for_the_other_after_draining() {
        let (mut a, mut b) = connected_pair();
        a.write(&[7]);
        a.close();

        assert!(!a.connected());
        assert!(!b.eof(), "Eof reported with unread bytes");

        let mut buffer = [0_u8; 1];
        b.read(&mut buffer);
        assert!(b.eof());
    }
}
