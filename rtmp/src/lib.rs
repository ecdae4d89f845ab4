//! An RTMP client engine.
//!
//! The crate covers the parts of the RTMP protocol that sit below the application level:
//!
//! * the plaintext handshake (`handshake`)
//! * splitting messages into chunks and compressing their headers against the previous message
//!   sent on the same channel (`chunk_io`)
//! * reassembling chunks received from the peer into complete messages
//! * reacting to protocol control messages (chunk size changes, pings, bandwidth notifications)
//!
//! `RtmpSession` ties all of it together.  It owns a `Transport` and is driven by repeatedly
//! calling `update()`, which never blocks:
//!
//! ```
//! use rtmp_amf0::{serialize, Amf0Value};
//! use rtmp_client::session::{RtmpSession, SessionConfig};
//! use rtmp_client::transport::MemoryTransport;
//!
//! let (client_transport, server_transport) = MemoryTransport::pair();
//! let mut client = RtmpSession::new(client_transport, SessionConfig::new());
//! let mut server = RtmpSession::new(server_transport, SessionConfig::new());
//!
//! client.connect("rtmp://localhost/live").unwrap();
//! server.connect("rtmp://localhost/live").unwrap();
//!
//! while !client.connected() || !server.connected() {
//!     client.update();
//!     server.update();
//! }
//!
//! let payload = serialize(&[
//!     Amf0Value::Utf8String("createStream".to_string()),
//!     Amf0Value::Number(2.0),
//!     Amf0Value::Null,
//! ]).unwrap();
//!
//! client.call(&payload).unwrap();
//! server.update();
//!
//! let message = server.get_message().unwrap();
//! assert_eq!(message.payload(), Some(&payload[..]));
//! ```

pub mod byte_order;
pub mod chunk_io;
pub mod handshake;
pub mod messages;
pub mod packet;
pub mod session;
pub mod time;
pub mod transport;
