//! The [`Host`] trait and supporting types.

/// The outcome of polling the byte source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRead {
    /// The number of bytes copied into the buffer. Always at least one and
    /// never more than the buffer length.
    Bytes(usize),
    /// Nothing is available right now; more may arrive later.
    Pending,
    /// The source has ended and will never produce bytes again.
    Closed,
}

/// The capabilities a connection consumes from its host.
///
/// One implementation backs one connection: the host wires the engine to
/// its byte source (stdin or similar), its byte sink (stdout or similar),
/// and the unreliable datagram carrier. Every method is non-blocking and is
/// only ever called from the driver thread, inside an event handler.
pub trait Host {
    /// Polls the byte source, copying at most `buf.len()` bytes.
    fn read_source(&mut self, buf: &mut [u8]) -> SourceRead;

    /// Writes bytes to the sink, returning how many were accepted. Short
    /// writes are legal; the engine retries within the handler and
    /// otherwise picks the remainder up on a later tick.
    fn write_sink(&mut self, bytes: &[u8]) -> usize;

    /// Signals end-of-stream to the sink. Called once, when the peer's FIN
    /// is accepted.
    fn shutdown_sink(&mut self);

    /// The number of bytes the sink will currently accept without
    /// blocking.
    fn sink_free_space(&self) -> usize;

    /// Sends a datagram on the carrier, best effort, returning how many
    /// bytes were accepted. Short sends are retried by the engine in a
    /// bounded loop.
    fn send_datagram(&mut self, bytes: &[u8]) -> usize;

    /// Releases the carrier. Called exactly once, after the engine has been
    /// destroyed.
    fn close_carrier(&mut self);
}
