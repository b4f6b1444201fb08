//! The process-wide set of live connections.
//!
//! [`Registry`] owns every [`Engine`] and is the surface the host drives:
//! source and datagram events are dispatched to a single engine by handle,
//! the timer tick is fanned out to all of them. Engines live in a slab;
//! destruction clears the slot, returns it to a free-list, and releases
//! the carrier, so a handler that ends a connection can never touch freed
//! engine state.

use crate::config::Config;
use crate::engine::{Engine, SegmentArrivesResult, TickResult};
use crate::host::Host;

/// An opaque handle naming one live connection in a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(usize);

/// The owned collection of live engines.
#[derive(Debug)]
pub struct Registry<H: Host> {
    slots: Vec<Option<Engine<H>>>,
    free: Vec<usize>,
}

impl<H: Host> Default for Registry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Host> Registry<H> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Registers an engine for a connection the carrier has opened.
    pub fn open(&mut self, host: H, config: Config) -> ConnectionHandle {
        let engine = Engine::new(host, config);
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(engine);
                ConnectionHandle(index)
            }
            None => {
                self.slots.push(Some(engine));
                ConnectionHandle(self.slots.len() - 1)
            }
        }
    }

    /// The number of live connections.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispatches a source-readable event to one connection. Events for
    /// handles that have already closed are ignored.
    pub fn on_source_readable(&mut self, handle: ConnectionHandle) {
        if let Some(engine) = self.slots.get_mut(handle.0).and_then(Option::as_mut) {
            engine.on_source_readable();
        }
    }

    /// Dispatches a received datagram to one connection, destroying it if
    /// this datagram completed the teardown handshake.
    pub fn on_datagram(&mut self, handle: ConnectionHandle, bytes: &[u8]) {
        let closed = match self.slots.get_mut(handle.0).and_then(Option::as_mut) {
            Some(engine) => engine.on_datagram(bytes) == SegmentArrivesResult::Close,
            None => false,
        };
        if closed {
            self.close(handle.0);
        }
    }

    /// Broadcasts the periodic timer tick to every live connection,
    /// destroying those that have exhausted their retransmissions.
    pub fn on_timer_tick(&mut self) {
        for index in 0..self.slots.len() {
            let closed = match self.slots[index].as_mut() {
                Some(engine) => engine.on_tick() == TickResult::Close,
                None => false,
            };
            if closed {
                self.close(index);
            }
        }
    }

    fn close(&mut self, index: usize) {
        if let Some(engine) = self.slots.get_mut(index).and_then(Option::take) {
            engine.shutdown();
            self.free.push(index);
        }
    }
}
