//! The per-connection protocol engine.
//!
//! [`Engine`] ties together the wire codec, the send and receive queues,
//! the sliding-window counters, the retransmission timer, and the teardown
//! state for one connection. It is implemented apart from the
//! [`Registry`](crate::Registry) so that a single connection can be driven
//! and inspected in isolation.
//!
//! The engine is event-driven and never blocks: the host calls
//! [`Engine::on_source_readable`] when the byte source has data,
//! [`Engine::on_datagram`] when the carrier delivers a datagram, and
//! [`Engine::on_tick`] on every timer period. Handlers that can end the
//! connection report it through their return value; the caller is expected
//! to drop the engine and must not touch it again afterwards.

use crate::config::Config;
use crate::host::{Host, SourceRead};
use crate::segment::{Segment, SegmentBuilder, SegmentHeader, MAX_SEG_DATA_SIZE};


mod send_space;
use send_space::SendSpace;

mod receive_space;
use receive_space::ReceiveSpace;

mod send_queue;
use send_queue::SendQueue;

mod receive_queue;
use receive_queue::ReceiveQueue;

mod timer;
use timer::RetransmitTimer;

mod teardown;
pub use teardown::Teardown;

/// Consecutive full timeouts after which the connection is forced closed.
pub const RETRANSMIT_LIMIT: u32 = 6;

/// A chunk beginning with this marker stops the source read loop and is
/// discarded, a diagnostic hook kept for compatibility with existing
/// drivers.
const TRUNCATE_SENTINEL: &[u8] = b"###truncate###";

/// Attempts per datagram before giving up on a carrier that keeps
/// accepting short.
const SHORT_SEND_RETRIES: usize = 4;

/// Attempts per queue element before leaving the remainder for a later
/// tick.
const SHORT_WRITE_RETRIES: usize = 4;

/// The state machine for a single connection.
#[derive(Debug)]
pub struct Engine<H: Host> {
    host: H,
    snd: SendSpace,
    rcv: ReceiveSpace,
    send_queue: SendQueue,
    receive_queue: ReceiveQueue,
    timer: RetransmitTimer,
    teardown: Teardown,
}

impl<H: Host> Engine<H> {
    /// Creates the engine for a connection the carrier has already opened.
    pub fn new(host: H, config: Config) -> Self {
        Self {
            host,
            snd: SendSpace::new(config.send_window),
            rcv: ReceiveSpace::new(config.recv_window),
            send_queue: SendQueue::default(),
            receive_queue: ReceiveQueue::default(),
            timer: RetransmitTimer::new(config.timer_overflow()),
            teardown: Teardown::None,
        }
    }

    /// How far the connection has progressed into its teardown.
    pub fn teardown(&self) -> Teardown {
        self.teardown
    }

    /// Drains the byte source into payload-sized chunks and ships as many
    /// as the send window allows.
    ///
    /// End-of-source begins the active close: a bare FIN is emitted and the
    /// retransmission timer armed. Reading stops early on a chunk carrying
    /// the truncation marker, which is discarded.
    pub fn on_source_readable(&mut self) {
        let mut buf = [0; MAX_SEG_DATA_SIZE];
        loop {
            match self.host.read_source(&mut buf) {
                SourceRead::Pending => break,
                SourceRead::Closed => {
                    tracing::debug!("source closed, beginning active close");
                    self.teardown = Teardown::ActiveClosing;
                    let ackno = self.rcv.ackno;
                    self.send_fin(ackno);
                    self.timer.arm();
                    break;
                }
                SourceRead::Bytes(count) => {
                    let chunk = &buf[..count];
                    if count > TRUNCATE_SENTINEL.len() && chunk.starts_with(TRUNCATE_SENTINEL) {
                        break;
                    }
                    self.send_queue.push(chunk.to_vec());
                }
            }
        }
        self.flush_send_window();
    }

    /// Processes a datagram delivered by the carrier.
    ///
    /// Undecodable datagrams are discarded without response; the peer's
    /// retransmission supplies recovery. A retransmit of the most recently
    /// accepted data segment is answered with a duplicate acknowledgement
    /// and not reprocessed.
    #[must_use]
    pub fn on_datagram(&mut self, bytes: &[u8]) -> SegmentArrivesResult {
        let segment = match Segment::from_bytes(bytes) {
            Ok(segment) => segment,
            Err(err) => {
                tracing::trace!(%err, "discarding undecodable datagram");
                return SegmentArrivesResult::Ok;
            }
        };
        let header = segment.header;

        if header.seqno == self.rcv.last_ackno
            && header.seqno != self.rcv.ackno
            && !header.ctl.ack()
        {
            tracing::trace!(
                seqno = header.seqno,
                "duplicate of previous segment, re-acknowledging"
            );
            let last_ackno = self.rcv.last_ackno;
            self.send_ack(last_ackno);
            return SegmentArrivesResult::Ok;
        }

        if header.ctl.fin() {
            if header.ctl.ack() {
                // The peer acknowledged our FIN and closed in one segment.
                self.rcv.ackno = header.seqno.wrapping_add(1);
                let ackno = self.rcv.ackno;
                self.send_ack(ackno);
                return SegmentArrivesResult::Close;
            }
            return self.on_fin(&header);
        }

        if segment.data_len() == 0 && header.ctl.ack() {
            return self.on_ack(header.ackno);
        }

        // Everything else carries data: a payload makes a segment data
        // regardless of its ACK bit, and a flagless empty segment takes the
        // same path with nothing to enqueue.
        self.on_data(segment);
        SegmentArrivesResult::Ok
    }

    /// Accepts an in-order data segment into the receive queue, then tries
    /// to move bytes onward to the sink.
    fn on_data(&mut self, segment: Segment) {
        let data_len = segment.data_len() as u16;
        if segment.header.seqno != self.rcv.ackno {
            tracing::trace!(
                seqno = segment.header.seqno,
                expected = self.rcv.ackno,
                "out-of-order segment discarded"
            );
        } else if self.rcv.window_used as u32 + data_len as u32 <= self.rcv.window as u32 {
            self.rcv.last_ackno = self.rcv.ackno;
            self.rcv.ackno = segment.header.seqno.wrapping_add(data_len as u32);
            self.rcv.window_used += data_len;
            self.receive_queue.push(segment.payload);
        } else {
            tracing::trace!(
                seqno = segment.header.seqno,
                window_used = self.rcv.window_used,
                "receive window full, segment discarded"
            );
        }
        self.deliver_to_sink();
    }

    /// Applies a cumulative acknowledgement to the send queue.
    #[must_use]
    fn on_ack(&mut self, ackno: u32) -> SegmentArrivesResult {
        if self.teardown == Teardown::PassiveClosing {
            // The peer's acknowledgement of our FIN; nothing is left to do.
            return SegmentArrivesResult::Close;
        }

        // With nothing outstanding this is a stale acknowledgement. Leave
        // the timer alone: it may be guarding a FIN.
        if self.send_queue.is_empty() {
            return SegmentArrivesResult::Ok;
        }

        while let Some(front) = self.send_queue.front() {
            if front.next_seqno == 0 || ackno < front.next_seqno {
                break;
            }
            self.snd.seqno = front.next_seqno;
            self.snd.window_used -= front.payload.len() as u16;
            self.send_queue.drop_front();
        }

        if ackno == self.snd.next_seqno {
            self.timer.disarm();
        }
        self.timer.acknowledge();
        SegmentArrivesResult::Ok
    }

    /// Handles the peer's FIN.
    #[must_use]
    fn on_fin(&mut self, header: &SegmentHeader) -> SegmentArrivesResult {
        self.rcv.last_ackno = self.rcv.ackno;
        self.rcv.ackno = header.seqno.wrapping_add(1);
        let ackno = self.rcv.ackno;

        if self.teardown != Teardown::ActiveClosing {
            tracing::debug!("peer closed first, beginning passive close");
            self.host.shutdown_sink();
            self.send_ack(ackno);
            self.send_fin(ackno);
            self.timer.arm();
            self.teardown = Teardown::PassiveClosing;
            SegmentArrivesResult::Ok
        } else {
            // The answering FIN of our own active close.
            self.send_ack(ackno);
            SegmentArrivesResult::Close
        }
    }

    /// Advances the retransmission timer and performs whatever housekeeping
    /// this tick calls for.
    ///
    /// While the timer is armed, a full timeout retransmits the window (or
    /// the FIN, during teardown); hitting [`RETRANSMIT_LIMIT`] consecutive
    /// timeouts forces the connection into an active close, and hitting it
    /// again while closing gives up entirely. While the timer is idle, the
    /// tick ships any payloads that now fit the window and drains the
    /// receive queue toward the sink.
    #[must_use]
    pub fn on_tick(&mut self) -> TickResult {
        if self.timer.armed {
            if self.timer.advance() {
                if self.timer.expirations == RETRANSMIT_LIMIT {
                    if self.teardown != Teardown::None {
                        tracing::debug!("retransmission limit reached while closing, giving up");
                        return TickResult::Close;
                    }
                    tracing::debug!("retransmission limit reached, forcing active close");
                    let ackno = self.rcv.ackno;
                    self.send_fin(ackno);
                    self.timer.arm();
                    self.timer.expirations = 0;
                    self.teardown = Teardown::ActiveClosing;
                } else if self.teardown != Teardown::None {
                    let last_ackno = self.rcv.last_ackno;
                    tracing::trace!(last_ackno, "retransmitting FIN");
                    self.send_fin(last_ackno);
                } else {
                    tracing::trace!(seqno = self.snd.seqno, "retransmitting send window");
                    self.flush_send_window();
                }
            }
        } else {
            self.flush_send_window();
            self.deliver_to_sink();
        }
        TickResult::Ok
    }

    /// Walks the send queue from the front and emits every payload that
    /// fits the send window.
    ///
    /// The same walk serves first transmissions and go-back-N retransmits:
    /// the cursor restarts at the lowest unacknowledged byte and every
    /// element's tag is overwritten in passing.
    fn flush_send_window(&mut self) {
        self.snd.window_used = 0;
        self.snd.next_seqno = self.snd.seqno;
        let mut emitted = false;

        for index in 0..self.send_queue.len() {
            let (payload_len, wire) = {
                let Some(entry) = self.send_queue.get(index) else {
                    break;
                };
                let payload_len = entry.payload.len() as u16;
                if self.snd.window_used as u32 + payload_len as u32 > self.snd.window as u32 {
                    break;
                }
                let wire = SegmentBuilder::new(self.snd.next_seqno)
                    .ackno(self.rcv.ackno)
                    .wnd(self.advertised_window())
                    .build(&entry.payload);
                (payload_len, wire)
            };

            self.send_wire(&wire);
            self.snd.next_seqno = self.snd.next_seqno.wrapping_add(payload_len as u32);
            if let Some(entry) = self.send_queue.get_mut(index) {
                entry.next_seqno = self.snd.next_seqno;
            }
            self.snd.window_used += payload_len;
            emitted = true;
        }

        if emitted {
            self.timer.arm();
        }
    }

    /// Moves bytes from the receive queue to the sink, acknowledging each
    /// element as it completes.
    fn deliver_to_sink(&mut self) {
        loop {
            let Some(byte_left) = self.receive_queue.front().map(|entry| entry.byte_left) else {
                break;
            };
            let free = self.host.sink_free_space();
            if free == 0 || byte_left > free {
                break;
            }

            let mut completed = false;
            if let Some(entry) = self.receive_queue.front_mut() {
                for _ in 0..SHORT_WRITE_RETRIES {
                    if entry.byte_left == 0 {
                        break;
                    }
                    let written = self.host.write_sink(&entry.payload[entry.byte_used..]);
                    entry.byte_used += written;
                    entry.byte_left -= written;
                    self.rcv.window_used -= written as u16;
                }
                completed = entry.byte_left == 0;
            }
            if !completed {
                // Sink stalled mid-element; a later tick picks it back up.
                break;
            }

            let ackno = self.rcv.ackno;
            self.send_ack(ackno);
            self.receive_queue.drop_front();
        }
    }

    /// Tears the engine down, releasing the carrier. Consumes the engine so
    /// no handler can run afterwards.
    pub(crate) fn shutdown(mut self) {
        self.host.close_carrier();
    }

    /// Only whole-segment capacity is advertised.
    fn advertised_window(&self) -> u16 {
        let free = (self.rcv.window - self.rcv.window_used) as usize;
        (MAX_SEG_DATA_SIZE * (free / MAX_SEG_DATA_SIZE)) as u16
    }

    fn control_builder(&self, ackno: u32) -> SegmentBuilder {
        SegmentBuilder::new(self.snd.seqno)
            .ackno(ackno)
            .wnd(self.advertised_window())
    }

    fn send_ack(&mut self, ackno: u32) {
        let wire = self.control_builder(ackno).ack().build(&[]);
        self.send_wire(&wire);
    }

    fn send_fin(&mut self, ackno: u32) {
        let wire = self.control_builder(ackno).fin().build(&[]);
        self.send_wire(&wire);
    }

    /// Hands a datagram to the carrier, retrying short sends a bounded
    /// number of times.
    fn send_wire(&mut self, bytes: &[u8]) {
        let mut sent = 0;
        let mut attempts = 0;
        while sent < bytes.len() && attempts < SHORT_SEND_RETRIES {
            sent += self.host.send_datagram(&bytes[sent..]);
            attempts += 1;
        }
        if sent < bytes.len() {
            tracing::warn!(sent, len = bytes.len(), "carrier refused a full datagram");
        }
    }
}

/// The result of handing a datagram to the engine.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentArrivesResult {
    /// The datagram was processed or discarded; the connection lives on.
    Ok,
    /// The teardown handshake completed; the caller should drop the engine.
    Close,
}

/// The result of advancing the engine by one timer tick.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    /// The tick was processed; the connection lives on.
    Ok,
    /// The retransmission limit was exhausted during teardown; the caller
    /// should drop the engine.
    Close,
}
