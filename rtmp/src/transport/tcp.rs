use super::Transport;
use bytes::{Buf, BytesMut};
use std::cmp::min;
use std::io;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use tracing::{debug, error};

const BUFFER_SIZE: usize = 4096;

/// Bytes allowed to wait for the socket before writes are refused
pub const DEFAULT_SEND_QUEUE_LIMIT: usize = 1024 * 1024;

/// A non-blocking TCP connection.
///
/// Received bytes are buffered until a read asks for no more than what has arrived, and written
/// bytes are queued until the socket accepts them.  Both buffers are serviced on every call.
/// Once the send queue holds `send_queue_limit` bytes, writes only accept what still fits.
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    received: BytesMut,
    send_queue: BytesMut,
    send_queue_limit: usize,
    bad: bool,
    peer_closed: bool,
}

impl Default for TcpTransport {
    fn default() -> Self {
        TcpTransport::new()
    }
}

impl TcpTransport {
    pub fn new() -> TcpTransport {
        TcpTransport::with_send_queue_limit(DEFAULT_SEND_QUEUE_LIMIT)
    }

    pub fn with_send_queue_limit(limit: usize) -> TcpTransport {
        TcpTransport {
            stream: None,
            received: BytesMut::new(),
            send_queue: BytesMut::new(),
            send_queue_limit: limit,
            bad: false,
            peer_closed: false,
        }
    }

    fn receive(&mut self) {
        let stream = match self.stream {
            Some(ref mut stream) => stream,
            None => return,
        };

        let mut buffer = [0_u8; BUFFER_SIZE];
        loop {
            match stream.read(&mut buffer) {
                Ok(0) => {
                    debug!("Peer closed the connection");
                    self.peer_closed = true;
                    return;
                }

                Ok(count) => self.received.extend_from_slice(&buffer[..count]),

                Err(ref x) if x.kind() == io::ErrorKind::WouldBlock => return,
                Err(ref x) if x.kind() == io::ErrorKind::Interrupted => continue,
                Err(x) => {
                    error!("Failed to read from socket: {}", x);
                    self.bad = true;
                    return;
                }
            }
        }
    }

    fn flush(&mut self) {
        let stream = match self.stream {
            Some(ref mut stream) => stream,
            None => return,
        };

        while !self.send_queue.is_empty() {
            match stream.write(&self.send_queue[..]) {
                Ok(0) => {
                    error!("Socket refused to accept more bytes");
                    self.bad = true;
                    return;
                }

                Ok(count) => self.send_queue.advance(count),

                Err(ref x) if x.kind() == io::ErrorKind::WouldBlock => return,
                Err(ref x) if x.kind() == io::ErrorKind::Interrupted => continue,
                Err(x) => {
                    error!("Failed to write to socket: {}", x);
                    self.bad = true;
                    return;
                }
            }
        }
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_nodelay(true)?;
        stream.set_nonblocking(true)?;

        self.stream = Some(stream);
        self.received.clear();
        self.send_queue.clear();
        self.bad = false;
        self.peer_closed = false;
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> usize {
        self.flush();
        if self.received.len() < buffer.len() {
            self.receive();
        }

        if self.received.len() < buffer.len() {
            return 0;
        }

        let bytes = self.received.split_to(buffer.len());
        buffer.copy_from_slice(&bytes[..]);
        buffer.len()
    }

    fn write(&mut self, data: &[u8]) -> usize {
        if self.stream.is_none() || self.bad {
            return 0;
        }

        self.flush();
        let accepted = min(data.len(), self.send_queue_limit.saturating_sub(self.send_queue.len()));
        if accepted < data.len() {
            debug!("Send queue full, accepting {} of {} bytes", accepted, data.len());
        }

        self.send_queue.extend_from_slice(&data[..accepted]);
        self.flush();
        accepted
    }

    fn connected(&self) -> bool {
        self.stream.is_some()
    }

    fn bad(&self) -> bool {
        self.bad
    }

    fn eof(&self) -> bool {
        self.peer_closed && self.received.is_empty()
    }

    fn close(&mut self) {
        self.flush();
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }

        self.received.clear();
        self.send_queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn unconnected_transport_reads_and_writes_nothing() {
        let mut transport = TcpTransport::new();
        let mut buffer = [0_u8; 4];

        assert!(!transport.connected());
        assert_eq!(transport.read(&mut buffer), 0);
        assert_eq!(transport.write(&[1, 2]), 0);
    }

    #[test]
    fn reads_only_complete_requests() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut transport = TcpTransport::new();
        transport.connect("127.0.0.1", port).unwrap();
        let (mut server_side, _) = listener.accept().unwrap();

        server_side.write_all(&[1, 2, 3]).unwrap();
        server_side.flush().unwrap();

        let mut buffer = [0_u8; 3];
        let mut attempts = 0;
        while transport.read(&mut buffer) == 0 {
            attempts += 1;
            assert!(attempts < 1000, "Bytes never arrived");
            std::thread::sleep(std::time::Duration::from_millis(1));
        }

        assert_eq!(buffer, [1, 2, 3]);

        let mut buffer = [0_u8; 1];
        assert_eq!(transport.read(&mut buffer), 0, "Read more bytes than were sent");
    }

    #[test]
    fn writes_are_refused_once_send_queue_is_full() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let limit = 64 * 1024;
        let mut transport = TcpTransport::with_send_queue_limit(limit);
        transport.connect("127.0.0.1", port).unwrap();
        let (_server_side, _) = listener.accept().unwrap();

        // Nothing reads on the server side, so the socket's buffers eventually fill up
        let block = vec![7_u8; limit];
        let mut accepted = limit;
        for _ in 0..2000 {
            accepted = transport.write(&block);
            if accepted < block.len() {
                break;
            }
        }

        assert!(accepted < block.len(), "Every write was accepted");
        assert!(transport.send_queue.len() <= limit, "Send queue grew past its limit");
        assert!(!transport.bad());
    }
}
