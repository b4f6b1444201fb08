//! The wire codec: segment header layout, control flags, and checksum
//! handling.
//!
//! A segment is a single datagram carrying a fixed 18-byte header and an
//! optional payload. All multi-byte header fields are big-endian on the
//! wire. The checksum is the internet-style 16-bit one's-complement sum
//! over the entire segment with the checksum field zeroed.

use crate::utility::Checksum;
use thiserror::Error as ThisError;

/// The maximum number of payload bytes carried by a single segment.
pub const MAX_SEG_DATA_SIZE: usize = 1000;

/// The size of the fixed segment header on the wire.
pub const SEGMENT_HEADER_SIZE: usize = 18;

/// A decoded segment header. Kept distinct from the wire bytes; received
/// buffers are never mutated during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Sequence number of the first payload byte
    pub seqno: u32,
    /// Next in-order byte expected from the peer
    pub ackno: u32,
    /// Total segment length in bytes, header included
    pub len: u16,
    /// One's-complement checksum over the whole segment
    pub cksum: u16,
    /// Control flags
    pub ctl: Control,
    /// Advertised receive window
    pub window: u16,
}

/// A segment paired with its payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub header: SegmentHeader,
    pub payload: Vec<u8>,
}

impl Segment {
    /// Decodes and validates a received datagram.
    ///
    /// The declared length must match the number of bytes actually
    /// received and the checksum must verify; anything else is reported as
    /// an error so the caller can discard the datagram. The peer's
    /// retransmission supplies recovery, so no response is warranted.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SegmentError> {
        if bytes.len() < SEGMENT_HEADER_SIZE {
            return Err(SegmentError::TooShort);
        }

        let len = u16::from_be_bytes([bytes[8], bytes[9]]);
        if len as usize != bytes.len() {
            return Err(SegmentError::LengthMismatch {
                declared: len,
                actual: bytes.len(),
            });
        }

        let expected = u16::from_be_bytes([bytes[10], bytes[11]]);
        let actual = segment_checksum(bytes);
        if expected != actual {
            return Err(SegmentError::InvalidChecksum { expected, actual });
        }

        let header = SegmentHeader {
            seqno: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            ackno: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            len,
            cksum: expected,
            ctl: Control::from(u32::from_be_bytes([
                bytes[12], bytes[13], bytes[14], bytes[15],
            ])),
            window: u16::from_be_bytes([bytes[16], bytes[17]]),
        };

        Ok(Segment {
            header,
            payload: bytes[SEGMENT_HEADER_SIZE..].to_vec(),
        })
    }

    /// The number of payload bytes carried by the segment.
    pub fn data_len(&self) -> usize {
        self.payload.len()
    }
}

/// Computes the checksum of a serialised segment, skipping the checksum
/// field itself. Equivalent to summing with the field zeroed.
fn segment_checksum(bytes: &[u8]) -> u16 {
    let mut checksum = Checksum::new();
    checksum.add_slice(&bytes[..10]);
    checksum.add_slice(&bytes[12..]);
    checksum.as_u16()
}

/// The segment control flags, stored in a 32-bit field on the wire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Control(u32);

impl Control {
    const FIN: u32 = 0x1;
    const ACK: u32 = 0x2;

    pub fn new(fin: bool, ack: bool) -> Self {
        Self(fin as u32 * Self::FIN | ack as u32 * Self::ACK)
    }

    /// No more data from sender
    pub fn fin(&self) -> bool {
        self.0 & Self::FIN != 0
    }

    /// Acknowledgment field significant
    pub fn ack(&self) -> bool {
        self.0 & Self::ACK != 0
    }
}

impl From<u32> for Control {
    fn from(n: u32) -> Self {
        Self(n)
    }
}

impl From<Control> for u32 {
    fn from(control: Control) -> Self {
        control.0
    }
}

/// Assembles a segment and serialises it with its checksum filled in.
#[derive(Debug, Clone, Copy)]
pub struct SegmentBuilder {
    seqno: u32,
    ackno: u32,
    ctl: Control,
    window: u16,
}

impl SegmentBuilder {
    pub fn new(seqno: u32) -> Self {
        Self {
            seqno,
            ackno: 0,
            ctl: Control::default(),
            window: 0,
        }
    }

    /// Sets the acknowledgement number without raising the ACK flag. Data
    /// segments carry the current ackno this way.
    pub fn ackno(mut self, ackno: u32) -> Self {
        self.ackno = ackno;
        self
    }

    /// Raises the ACK flag.
    pub fn ack(mut self) -> Self {
        self.ctl.0 |= Control::ACK;
        self
    }

    /// Raises the FIN flag.
    pub fn fin(mut self) -> Self {
        self.ctl.0 |= Control::FIN;
        self
    }

    /// Sets the advertised window.
    pub fn wnd(mut self, window: u16) -> Self {
        self.window = window;
        self
    }

    /// Serialises the segment, computing the checksum over the header and
    /// payload.
    pub fn build(self, payload: &[u8]) -> Vec<u8> {
        debug_assert!(payload.len() <= MAX_SEG_DATA_SIZE);
        let len = (SEGMENT_HEADER_SIZE + payload.len()) as u16;

        let mut bytes = Vec::with_capacity(len as usize);
        bytes.extend_from_slice(&self.seqno.to_be_bytes());
        bytes.extend_from_slice(&self.ackno.to_be_bytes());
        bytes.extend_from_slice(&len.to_be_bytes());
        bytes.extend_from_slice(&[0, 0]);
        bytes.extend_from_slice(&u32::from(self.ctl).to_be_bytes());
        bytes.extend_from_slice(&self.window.to_be_bytes());
        bytes.extend_from_slice(payload);

        let cksum = segment_checksum(&bytes);
        bytes[10..12].copy_from_slice(&cksum.to_be_bytes());
        bytes
    }
}

#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
pub enum SegmentError {
    #[error("Too few bytes to constitute a segment header")]
    TooShort,
    #[error("Declared length {declared} does not match the {actual} bytes received")]
    LengthMismatch { declared: u16, actual: usize },
    #[error("Expected checksum {expected:#06x} but computed {actual:#06x}")]
    InvalidChecksum { expected: u16, actual: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_segment() -> anyhow::Result<()> {
        let payload = b"Hello, world!";
        let bytes = SegmentBuilder::new(123456789)
            .ackno(10)
            .ack()
            .wnd(1024)
            .build(payload);
        assert_eq!(bytes.len(), SEGMENT_HEADER_SIZE + payload.len());

        let segment = Segment::from_bytes(&bytes)?;
        assert_eq!(segment.header.seqno, 123456789);
        assert_eq!(segment.header.ackno, 10);
        assert_eq!(segment.header.len as usize, bytes.len());
        assert_eq!(segment.header.window, 1024);
        assert!(segment.header.ctl.ack());
        assert!(!segment.header.ctl.fin());
        assert_eq!(segment.payload, payload);
        Ok(())
    }

    #[test]
    fn header_only_segment() {
        let bytes = SegmentBuilder::new(6).ackno(7).fin().wnd(2000).build(&[]);
        let segment = Segment::from_bytes(&bytes).unwrap();
        assert!(segment.header.ctl.fin());
        assert!(!segment.header.ctl.ack());
        assert_eq!(segment.data_len(), 0);
        assert_eq!(segment.header.len as usize, SEGMENT_HEADER_SIZE);
    }

    #[test]
    fn rejects_short_datagram() {
        let bytes = SegmentBuilder::new(1).build(b"data");
        assert_eq!(
            Segment::from_bytes(&bytes[..10]),
            Err(SegmentError::TooShort)
        );
    }

    #[test]
    fn rejects_truncated_payload() {
        let bytes = SegmentBuilder::new(1).build(b"truncated in flight");
        let cut = &bytes[..bytes.len() - 4];
        assert!(matches!(
            Segment::from_bytes(cut),
            Err(SegmentError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn rejects_flipped_bit() {
        let mut bytes = SegmentBuilder::new(1).ackno(1).wnd(2000).build(b"fragile");
        bytes[SEGMENT_HEADER_SIZE + 2] ^= 0x40;
        assert!(matches!(
            Segment::from_bytes(&bytes),
            Err(SegmentError::InvalidChecksum { .. })
        ));
    }

    #[test]
    fn checksum_covers_header_fields() {
        let mut bytes = SegmentBuilder::new(55).ackno(66).wnd(2000).build(b"x");
        // Corrupt the sequence number rather than the payload.
        bytes[3] ^= 0x01;
        assert!(matches!(
            Segment::from_bytes(&bytes),
            Err(SegmentError::InvalidChecksum { .. })
        ));
    }

    #[test]
    fn control_round_trips_through_u32() {
        let ctl = Control::new(true, true);
        assert_eq!(u32::from(ctl), 0x3);
        let ctl = Control::from(0x2u32);
        assert!(ctl.ack());
        assert!(!ctl.fin());
    }
}
