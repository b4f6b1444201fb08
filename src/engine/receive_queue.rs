use std::collections::VecDeque;

/// An in-order, checksum-verified payload awaiting delivery to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// The payload bytes, immutable once appended
    pub payload: Vec<u8>,
    /// Bytes already written to the sink
    pub byte_used: usize,
    /// Bytes still to write
    pub byte_left: usize,
}

/// The ordered queue of accepted payloads. Appended at the back as segments
/// arrive in order, consumed from the front as the sink accepts bytes.
/// There is no gap handling; only the segment matching the expected
/// sequence number is ever appended.
#[derive(Debug, Default)]
pub struct ReceiveQueue {
    entries: VecDeque<Inbound>,
}

impl ReceiveQueue {
    pub fn push(&mut self, payload: Vec<u8>) {
        let byte_left = payload.len();
        self.entries.push_back(Inbound {
            payload,
            byte_used: 0,
            byte_left,
        });
    }

    pub fn front(&self) -> Option<&Inbound> {
        self.entries.front()
    }

    pub fn front_mut(&mut self) -> Option<&mut Inbound> {
        self.entries.front_mut()
    }

    pub fn drop_front(&mut self) {
        self.entries.pop_front();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursors_track_partial_delivery() {
        let mut queue = ReceiveQueue::default();
        queue.push(b"payload".to_vec());

        let entry = queue.front_mut().unwrap();
        assert_eq!(entry.byte_left, 7);
        entry.byte_used += 3;
        entry.byte_left -= 3;

        assert_eq!(&queue.front().unwrap().payload[queue.front().unwrap().byte_used..], b"load");
        queue.drop_front();
        assert!(queue.is_empty());
    }
}
