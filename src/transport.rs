use crate::err::Error;

/// The datagram transport that ferries encoded segments to the peer. A
/// real implementation wraps a UDP socket or similar; tests wrap a
/// `Vec<Vec<u8>>` (see `tests/support.rs`).
pub trait Transport {
    /// Best-effort send of one encoded segment. `Err` is a permanent
    /// transport failure and the caller destroys the connection.
    fn send(&mut self, bytes: &[u8]) -> Result<usize, Error>;
}

/// Result of polling the application source for bytes to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// No bytes are currently available; try again later.
    WouldBlock,
    /// The source has reached end-of-stream; no more bytes will ever
    /// arrive.
    Eof,
    /// `n` bytes were written into the caller's buffer.
    Data(usize),
}

/// The application's outbound byte source (stdin-like).
pub trait Source {
    fn poll_input(&mut self, buf: &mut [u8]) -> InputEvent;
}

/// Result of pushing bytes to the application sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    /// `n` bytes were accepted.
    Accepted(usize),
    /// The sink has been closed and can accept no further bytes.
    Closed,
}

/// The application's inbound byte sink (stdout-like). A call with an empty
/// slice signals end-of-stream.
pub trait Sink {
    fn accept(&mut self, bytes: &[u8]) -> SinkEvent;
    fn bufspace(&self) -> usize;
}

/// A source of monotonic wall-clock time, abstracted so tests can drive
/// retransmission timeouts deterministically.
pub trait Clock {
    fn now_ms(&self) -> i64;
}
