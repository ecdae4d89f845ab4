use super::ChunkReadError;
use crate::byte_order::{decode_int24, decode_int32_le, read_network_long};
use crate::packet::{ChannelStore, Direction, HeaderType, Packet, PacketHeader, PacketType};
use crate::packet::EXTENDED_TIMESTAMP_SENTINEL;
use byteorder::{ByteOrder, LittleEndian};

/// The first one to three bytes of a chunk
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct BasicHeader {
    pub header_type: HeaderType,
    pub channel: u32,

    /// Number of bytes the basic header occupies
    pub length: usize,
}

impl BasicHeader {
    /// Number of bytes a basic header starting with `first_byte` occupies
    pub fn length_from_first_byte(first_byte: u8) -> usize {
        match first_byte & 0x3f {
            0 => 2,
            1 => 3,
            _ => 1,
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<BasicHeader, ChunkReadError> {
        let first_byte = match bytes.first() {
            Some(x) => *x,
            None => {
                return Err(ChunkReadError::IncompleteHeader {
                    expected: 1,
                    actual: 0,
                })
            }
        };

        let length = BasicHeader::length_from_first_byte(first_byte);
        if bytes.len() < length {
            return Err(ChunkReadError::IncompleteHeader {
                expected: length,
                actual: bytes.len(),
            });
        }

        let channel = match length {
            2 => bytes[1] as u32 + 64,
            3 => LittleEndian::read_u16(&bytes[1..3]) as u32 + 64,
            _ => (first_byte & 0x3f) as u32,
        };

        Ok(BasicHeader {
            header_type: HeaderType::from_flag_byte(first_byte),
            channel,
            length,
        })
    }
}

/// Returns how many bytes the chunk header starting with `bytes` occupies, as far as can be told
/// from the bytes collected so far.
///
/// Headers are read in steps: the first byte tells how long the basic header is, the basic header
/// tells how many field bytes follow, and the timestamp field tells whether an extended timestamp
/// follows.  Once the returned value equals `bytes.len()` the header is complete.
pub fn header_length(bytes: &[u8]) -> usize {
    let first_byte = match bytes.first() {
        Some(x) => *x,
        None => return 1,
    };

    let basic_length = BasicHeader::length_from_first_byte(first_byte);
    if bytes.len() < basic_length {
        return basic_length;
    }

    let header_type = HeaderType::from_flag_byte(first_byte);
    let length = basic_length + header_type.size() - 1;
    if bytes.len() < length || header_type == HeaderType::Minimum {
        return length;
    }

    if decode_int24(&bytes[basic_length..]) == EXTENDED_TIMESTAMP_SENTINEL {
        length + 4
    } else {
        length
    }
}

/// Decodes a complete chunk header into the packet it belongs to.
///
/// Large headers start a new packet.  Every other header type continues from the packet stored
/// for the channel in the incoming set, which is checked out of `channels`: when the header
/// carries a data size a new message begins and any partially received payload is discarded,
/// otherwise the partial payload and its read progress carry over.  The timestamp of a
/// compressed header is a delta added to the stored timestamp.
///
/// The returned packet always has a payload buffer of `data_size` bytes.
pub fn decode_header(bytes: &[u8], channels: &mut ChannelStore) -> Result<Packet, ChunkReadError> {
    let basic = BasicHeader::parse(bytes)?;
    let expected = header_length(bytes);
    if bytes.len() < expected {
        return Err(ChunkReadError::IncompleteHeader {
            expected,
            actual: bytes.len(),
        });
    }

    let mut packet = match basic.header_type {
        HeaderType::Large => Packet::header_only(PacketHeader::new(basic.channel, PacketType::None)),
        _ => match channels.check_out(Direction::Incoming, basic.channel) {
            Some(packet) => packet,
            None => {
                return Err(ChunkReadError::NoPreviousPacketOnChannel {
                    channel: basic.channel,
                })
            }
        },
    };

    let field_count = basic.header_type.size() - 1;
    let fields = &bytes[basic.length..basic.length + field_count];
    let mut has_extended_timestamp = false;

    if fields.len() >= 3 {
        let timestamp = decode_int24(fields);
        if timestamp == EXTENDED_TIMESTAMP_SENTINEL {
            has_extended_timestamp = true;
        } else if basic.header_type == HeaderType::Large {
            packet.header.timestamp = timestamp;
        } else {
            packet.header.timestamp = packet.header.timestamp.wrapping_add(timestamp);
        }

        if fields.len() >= 6 {
            packet.clear_payload();
            packet.header.data_size = decode_int24(&fields[3..]) as usize;

            if fields.len() > 6 {
                packet.header.packet_type = PacketType::from(fields[6]);

                if fields.len() == 11 {
                    packet.header.stream_id = decode_int32_le(&fields[7..]) as u32;
                }
            }
        }
    }

    if has_extended_timestamp {
        let offset = basic.length + field_count;
        packet.header.timestamp = read_network_long(&bytes[offset..]);
    }

    if !packet.has_payload() {
        packet.header.header_type = basic.header_type;
    }

    packet.allocate_payload();
    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, WriteBytesExt};
    use std::io::Cursor;

    fn stored_packet(channel: u32, timestamp: u32, data_size: usize) -> Packet {
        let mut header = PacketHeader::new(channel, PacketType::Audio);
        header.timestamp = timestamp;
        header.data_size = data_size;
        header.stream_id = 1;
        Packet::header_only(header)
    }

    #[test]
    fn can_parse_single_byte_basic_header() {
        let basic = BasicHeader::parse(&[0b0100_0101]).unwrap();

        assert_eq!(basic.header_type, HeaderType::Medium);
        assert_eq!(basic.channel, 5);
        assert_eq!(basic.length, 1);
    }

    #[test]
    fn channel_escape_0_adds_one_byte_plus_64() {
        let basic = BasicHeader::parse(&[0b1000_0000, 10]).unwrap();

        assert_eq!(basic.header_type, HeaderType::Small);
        assert_eq!(basic.channel, 74);
        assert_eq!(basic.length, 2);
    }

    #[test]
    fn channel_escape_1_adds_little_endian_short_plus_64() {
        let basic = BasicHeader::parse(&[0b0000_0001, 0x00, 0x01]).unwrap();

        assert_eq!(basic.channel, 320);
        assert_eq!(basic.length, 3);
    }

    #[test]
    fn truncated_basic_header_is_incomplete() {
        let error = BasicHeader::parse(&[0b0000_0001, 0x00]).unwrap_err();

        assert_eq!(
            error,
            ChunkReadError::IncompleteHeader {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn header_length_grows_as_bytes_are_collected() {
        assert_eq!(header_length(&[]), 1);
        assert_eq!(header_length(&[0x00]), 2);
        assert_eq!(header_length(&[0x00, 0x05]), 13);
        assert_eq!(header_length(&[0x43]), 8);
        assert_eq!(header_length(&[0x83]), 4);
        assert_eq!(header_length(&[0xc3]), 1);
    }

    #[test]
    fn header_length_includes_extended_timestamp_when_sentinel_present() {
        let bytes = [0x03, 0xff, 0xff, 0xff, 0, 0, 0, 0x14, 0, 0, 0, 0];

        assert_eq!(header_length(&bytes[..3]), 12);
        assert_eq!(header_length(&bytes), 16);
    }

    #[test]
    fn can_decode_large_header() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_u8(0x03).unwrap();
        cursor.write_u24::<BigEndian>(72).unwrap();
        cursor.write_u24::<BigEndian>(300).unwrap();
        cursor.write_u8(0x14).unwrap();
        cursor.write_u32::<byteorder::LittleEndian>(5).unwrap();
        let bytes = cursor.into_inner();

        let mut channels = ChannelStore::new();
        let packet = decode_header(&bytes, &mut channels).unwrap();

        assert_eq!(packet.header.header_type, HeaderType::Large);
        assert_eq!(packet.header.channel, 3);
        assert_eq!(packet.header.timestamp, 72);
        assert_eq!(packet.header.data_size, 300);
        assert_eq!(packet.header.packet_type, PacketType::Invoke);
        assert_eq!(packet.header.stream_id, 5);
        assert_eq!(packet.payload_size(), 300);
        assert_eq!(packet.bytes_read, 0);
    }

    #[test]
    fn compressed_header_on_unknown_channel_is_an_error() {
        let mut channels = ChannelStore::new();
        let error = decode_header(&[0xc6], &mut channels).unwrap_err();

        assert_eq!(error, ChunkReadError::NoPreviousPacketOnChannel { channel: 6 });
    }

    #[test]
    fn can_decode_medium_header_against_stored_baseline() {
        let mut channels = ChannelStore::new();
        channels.store(Direction::Incoming, stored_packet(6, 1000, 10));

        let mut cursor = Cursor::new(Vec::new());
        cursor.write_u8(0x46).unwrap();
        cursor.write_u24::<BigEndian>(40).unwrap();
        cursor.write_u24::<BigEndian>(25).unwrap();
        cursor.write_u8(0x09).unwrap();
        let bytes = cursor.into_inner();

        let packet = decode_header(&bytes, &mut channels).unwrap();

        assert_eq!(packet.header.header_type, HeaderType::Medium);
        assert_eq!(packet.header.timestamp, 1040, "Delta was not applied to stored timestamp");
        assert_eq!(packet.header.data_size, 25);
        assert_eq!(packet.header.packet_type, PacketType::Video);
        assert_eq!(packet.header.stream_id, 1, "Stream id was not inherited");
        assert_eq!(packet.payload_size(), 25);
    }

    #[test]
    fn can_decode_small_header_against_stored_baseline() {
        let mut channels = ChannelStore::new();
        channels.store(Direction::Incoming, stored_packet(6, 1000, 10));

        let packet = decode_header(&[0x86, 0, 0, 40], &mut channels).unwrap();

        assert_eq!(packet.header.header_type, HeaderType::Small);
        assert_eq!(packet.header.timestamp, 1040);
        assert_eq!(packet.header.data_size, 10);
        assert_eq!(packet.header.packet_type, PacketType::Audio);
        assert_eq!(packet.payload_size(), 10);
    }

    #[test]
    fn delta_added_to_stored_timestamp_wraps() {
        let mut channels = ChannelStore::new();
        channels.store(Direction::Incoming, stored_packet(6, u32::max_value() - 4, 10));

        let packet = decode_header(&[0x86, 0, 0, 10], &mut channels).unwrap();

        assert_eq!(packet.header.timestamp, 5);
    }

    #[test]
    fn minimum_header_continues_partial_payload() {
        let mut partial = Packet::new(6, PacketType::Video, &[7_u8; 300]);
        partial.header.data_size = 300;
        partial.header.timestamp = 50;
        partial.bytes_read = 128;

        let mut channels = ChannelStore::new();
        channels.store(Direction::Incoming, partial);

        let packet = decode_header(&[0xc6], &mut channels).unwrap();

        assert_eq!(packet.bytes_read, 128);
        assert_eq!(packet.payload_size(), 300);
        assert_eq!(packet.payload().unwrap()[0], 7, "Partial payload was not kept");
        assert_eq!(packet.header.timestamp, 50);
        assert!(
            !channels.get(Direction::Incoming, 6).unwrap().has_payload(),
            "Stored packet still holds the payload"
        );
    }

    #[test]
    fn new_data_size_discards_partial_payload() {
        let mut partial = Packet::new(6, PacketType::Video, &[7_u8; 300]);
        partial.header.data_size = 300;
        partial.bytes_read = 128;

        let mut channels = ChannelStore::new();
        channels.store(Direction::Incoming, partial);

        let mut cursor = Cursor::new(Vec::new());
        cursor.write_u8(0x46).unwrap();
        cursor.write_u24::<BigEndian>(0).unwrap();
        cursor.write_u24::<BigEndian>(20).unwrap();
        cursor.write_u8(0x09).unwrap();
        let bytes = cursor.into_inner();

        let packet = decode_header(&bytes, &mut channels).unwrap();

        assert_eq!(packet.bytes_read, 0);
        assert_eq!(packet.payload(), Some(&[0_u8; 20][..]));
    }

    #[test]
    fn extended_timestamp_replaces_sentinel() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_u8(0x04).unwrap();
        cursor.write_u24::<BigEndian>(0xffffff).unwrap();
        cursor.write_u24::<BigEndian>(2).unwrap();
        cursor.write_u8(0x08).unwrap();
        cursor.write_u32::<byteorder::LittleEndian>(1).unwrap();
        cursor.write_u32::<BigEndian>(0x0123_4567).unwrap();
        let bytes = cursor.into_inner();

        let mut channels = ChannelStore::new();
        let packet = decode_header(&bytes, &mut channels).unwrap();

        assert_eq!(packet.header.timestamp, 0x0123_4567);
        assert_eq!(packet.header.packet_type, PacketType::Audio);
    }

    #[test]
    fn incomplete_header_is_rejected_without_touching_channels() {
        let mut channels = ChannelStore::new();
        channels.store(Direction::Incoming, Packet::new(6, PacketType::Audio, &[1, 2]));

        let error = decode_header(&[0x46, 0, 0], &mut channels).unwrap_err();

        assert_eq!(
            error,
            ChunkReadError::IncompleteHeader {
                expected: 8,
                actual: 3
            }
        );
        assert!(channels.get(Direction::Incoming, 6).unwrap().has_payload());
    }
}
