use super::Packet;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Which side of the connection a set of channels tracks
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// Remembers the last packet received and sent on every channel.
///
/// The incoming set holds partially received messages between chunks and, once a message is
/// complete, its header alone as the baseline for decoding the next compressed header.  The
/// outgoing set holds the header of the last message sent, which is what outgoing headers are
/// compressed against.  Stored timestamps are always absolute.
#[derive(Debug, Default)]
pub struct ChannelStore {
    incoming: HashMap<u32, Packet>,
    outgoing: HashMap<u32, Packet>,
}

impl ChannelStore {
    pub fn new() -> ChannelStore {
        ChannelStore {
            incoming: HashMap::new(),
            outgoing: HashMap::new(),
        }
    }

    pub fn has_packet(&self, direction: Direction, channel: u32) -> bool {
        self.set(direction).contains_key(&channel)
    }

    pub fn get(&self, direction: Direction, channel: u32) -> Option<&Packet> {
        self.set(direction).get(&channel)
    }

    /// Replaces whatever was stored on the packet's channel with `packet`
    pub fn store(&mut self, direction: Direction, packet: Packet) -> &mut Packet {
        let channel = packet.header.channel;
        match self.set_mut(direction).entry(channel) {
            Entry::Occupied(mut entry) => {
                entry.insert(packet);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(packet),
        }
    }

    /// Takes a working copy of the packet stored on `channel`.
    ///
    /// Any partially received payload moves into the copy, so the stored entry is left holding
    /// only the header until the working copy is stored again.
    pub fn check_out(&mut self, direction: Direction, channel: u32) -> Option<Packet> {
        self.set_mut(direction).get_mut(&channel).map(|x| x.detach())
    }

    /// Forgets every channel in both directions
    pub fn clear(&mut self) {
        self.incoming.clear();
        self.outgoing.clear();
    }

    fn set(&self, direction: Direction) -> &HashMap<u32, Packet> {
        match direction {
            Direction::Incoming => &self.incoming,
            Direction::Outgoing => &self.outgoing,
        }
    }

    fn set_mut(&mut self, direction: Direction) -> &mut HashMap<u32, Packet> {
        match direction {
            Direction::Incoming => &mut self.incoming,
            Direction::Outgoing => &mut self.outgoing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{PacketHeader, PacketType};

    #[test]
    fn channels_start_empty() {
        let store = ChannelStore::new();
        assert!(!store.has_packet(Direction::Incoming, 3));
        assert!(!store.has_packet(Direction::Outgoing, 3));
    }

    #[test]
    fn directions_are_independent() {
        let mut store = ChannelStore::new();
        store.store(Direction::Outgoing, Packet::header_only(PacketHeader::new(3, PacketType::Invoke)));

        assert!(store.has_packet(Direction::Outgoing, 3));
        assert!(!store.has_packet(Direction::Incoming, 3));
    }

    #[test]
    fn storing_replaces_previous_packet() {
        let mut store = ChannelStore::new();
        store.store(Direction::Incoming, Packet::header_only(PacketHeader::new(3, PacketType::Invoke)));
        store.store(Direction::Incoming, Packet::header_only(PacketHeader::new(3, PacketType::Flv)));

        let stored = store.get(Direction::Incoming, 3).unwrap();
        assert_eq!(stored.header.packet_type, PacketType::Flv);
    }

    #[test]
    fn checking_out_leaves_header_behind() {
        let mut store = ChannelStore::new();
        let mut packet = Packet::new(4, PacketType::Video, &[1, 2, 3, 4]);
        packet.header.timestamp = 99;
        packet.bytes_read = 2;
        store.store(Direction::Incoming, packet);

        let working = store.check_out(Direction::Incoming, 4).unwrap();
        assert_eq!(working.bytes_read, 2);
        assert_eq!(working.payload_size(), 4);
        assert_eq!(working.header.timestamp, 99);

        let stored = store.get(Direction::Incoming, 4).unwrap();
        assert!(!stored.has_payload());
        assert_eq!(stored.header.timestamp, 99);
    }

    #[test]
    fn checking_out_missing_channel_returns_none() {
        let mut store = ChannelStore::new();
        assert_eq!(store.check_out(Direction::Incoming, 4), None);
    }

    #[test]
    fn clear_forgets_both_directions() {
        let mut store = ChannelStore::new();
        store.store(Direction::Incoming, Packet::header_only(PacketHeader::new(3, PacketType::Invoke)));
        store.store(Direction::Outgoing, Packet::header_only(PacketHeader::new(8, PacketType::Invoke)));
        store.clear();

        assert!(!store.has_packet(Direction::Incoming, 3));
        assert!(!store.has_packet(Direction::Outgoing, 8));
    }
}
