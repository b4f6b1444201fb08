//! A compact reliable transport protocol for unreliable datagram carriers.
//!
//! ctcp delivers ordered, duplicate-free, checksum-verified byte streams
//! between two endpoints over a carrier that may drop, corrupt, or truncate
//! datagrams. Each side bounds the bytes in flight with a fixed sliding
//! window, lost segments are recovered with go-back-N retransmission, and
//! connections are torn down with a FIN handshake. Connections are assumed
//! open by the carrier, so there is no three-way handshake, and there is no
//! selective acknowledgement, RTT estimation, or congestion control.
//!
//! # Organization
//!
//! - [`segment`] implements the wire codec: the fixed header, the control
//!   flags, and the one's-complement checksum
//! - [`Engine`] holds the state for a single connection and handles its
//!   events
//! - [`Registry`] owns the live engines and fans the periodic timer tick
//!   out to all of them
//! - [`Host`] is the capability trait through which an engine reaches the
//!   carrier, the byte source, and the byte sink
//!
//! # Driving the protocol
//!
//! The host owns a [`Registry`] and delivers three events into it:
//! `on_source_readable` when the byte source has data, `on_datagram` when
//! the carrier hands over a datagram, and `on_timer_tick` on every period
//! of its timer. All handlers run to completion on the driver thread;
//! nothing in this crate blocks or spawns. When a connection finishes its
//! teardown the registry drops the engine and calls
//! [`Host::close_carrier`].

pub mod config;
pub use config::Config;

pub mod engine;
pub use engine::{Engine, SegmentArrivesResult, Teardown, TickResult};

pub mod host;
pub use host::{Host, SourceRead};

pub mod registry;
pub use registry::{ConnectionHandle, Registry};

pub mod segment;
pub use segment::{
    Control, Segment, SegmentBuilder, SegmentError, SegmentHeader, MAX_SEG_DATA_SIZE,
    SEGMENT_HEADER_SIZE,
};

mod utility;
