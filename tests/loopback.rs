//! Drives two registries against each other over an in-memory carrier,
//! using only the public API: a stream fed into one endpoint's source must
//! come out of the other endpoint's sink, and the FIN handshake must
//! destroy both connections.

use ctcp::{Config, Host, Registry, Segment, SourceRead};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Endpoint {
    source: VecDeque<Vec<u8>>,
    source_closed: bool,
    sink: Vec<u8>,
    sink_closed: bool,
    outbox: VecDeque<Vec<u8>>,
    carrier_closed: bool,
}

/// One side's view of the world, shared with the test through an `Rc` so
/// the test can feed the source and watch the sink while the engine owns
/// its copy.
#[derive(Debug, Clone, Default)]
struct LoopHost(Rc<RefCell<Endpoint>>);

impl Host for LoopHost {
    fn read_source(&mut self, buf: &mut [u8]) -> SourceRead {
        let mut endpoint = self.0.borrow_mut();
        match endpoint.source.pop_front() {
            Some(chunk) => {
                let count = chunk.len().min(buf.len());
                buf[..count].copy_from_slice(&chunk[..count]);
                SourceRead::Bytes(count)
            }
            None if endpoint.source_closed => SourceRead::Closed,
            None => SourceRead::Pending,
        }
    }

    fn write_sink(&mut self, bytes: &[u8]) -> usize {
        self.0.borrow_mut().sink.extend_from_slice(bytes);
        bytes.len()
    }

    fn shutdown_sink(&mut self) {
        self.0.borrow_mut().sink_closed = true;
    }

    fn sink_free_space(&self) -> usize {
        usize::MAX
    }

    fn send_datagram(&mut self, bytes: &[u8]) -> usize {
        self.0.borrow_mut().outbox.push_back(bytes.to_vec());
        bytes.len()
    }

    fn close_carrier(&mut self) {
        self.0.borrow_mut().carrier_closed = true;
    }
}

#[test]
fn loopback_transfer_and_close() {
    let a_end = LoopHost::default();
    let b_end = LoopHost::default();

    let mut a = Registry::new();
    let mut b = Registry::new();
    let a_conn = a.open(a_end.clone(), Config::default());
    let b_conn = b.open(b_end.clone(), Config::default());

    let message: Vec<u8> = (0..5000u32).map(|i| i as u8).collect();
    for chunk in message.chunks(1000) {
        a_end.0.borrow_mut().source.push_back(chunk.to_vec());
    }

    let mut rounds = 0;
    let mut source_closed = false;
    while !a.is_empty() || !b.is_empty() {
        rounds += 1;
        assert!(rounds < 200, "endpoints failed to finish");

        // Once the whole stream has crossed, end A's source so the FIN
        // handshake begins.
        if !source_closed && b_end.0.borrow().sink.len() == message.len() {
            a_end.0.borrow_mut().source_closed = true;
            source_closed = true;
        }

        a.on_source_readable(a_conn);
        loop {
            let Some(bytes) = a_end.0.borrow_mut().outbox.pop_front() else {
                break;
            };
            Segment::from_bytes(&bytes).expect("emitted datagram must decode");
            b.on_datagram(b_conn, &bytes);
        }
        loop {
            let Some(bytes) = b_end.0.borrow_mut().outbox.pop_front() else {
                break;
            };
            Segment::from_bytes(&bytes).expect("emitted datagram must decode");
            a.on_datagram(a_conn, &bytes);
        }
        a.on_timer_tick();
        b.on_timer_tick();
    }

    let a_endpoint = a_end.0.borrow();
    let b_endpoint = b_end.0.borrow();
    assert_eq!(b_endpoint.sink, message);
    assert!(b_endpoint.sink_closed);
    assert!(a_endpoint.carrier_closed);
    assert!(b_endpoint.carrier_closed);
}
