//! In-memory fakes for the four collaborator traits, used by the scenario
//! tests in `scenarios.rs` to drive `ConnectionState` deterministically
//! without a real socket, clock, or terminal.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use ctcp::{Clock, Error, InputEvent, Sink, SinkEvent, Source, Transport};

/// Records every frame handed to `send` and always reports success; the
/// channel itself never fails locally. Tests simulate loss by choosing not
/// to forward a recorded frame to the peer's `receive()`.
///
/// Cloning shares the underlying log, so a test can hand one clone to
/// `ConnectionState::init` and keep another to inspect what was sent.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        RecordingTransport::default()
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.borrow().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.borrow().len()
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        self.sent.borrow_mut().push(bytes.to_vec());
        Ok(bytes.len())
    }
}

/// An application byte source backed by an in-memory buffer.
pub struct ByteSource {
    data: VecDeque<u8>,
    eof: bool,
    eof_signaled: bool,
}

impl ByteSource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        ByteSource {
            data: data.into().into(),
            eof: true,
            eof_signaled: false,
        }
    }

    /// A source that never reaches end-of-stream (for tests that only
    /// care about the data segments, not the close handshake).
    pub fn open_ended(data: impl Into<Vec<u8>>) -> Self {
        ByteSource {
            data: data.into().into(),
            eof: false,
            eof_signaled: false,
        }
    }
}

impl Source for ByteSource {
    fn poll_input(&mut self, buf: &mut [u8]) -> InputEvent {
        if self.data.is_empty() {
            if self.eof && !self.eof_signaled {
                self.eof_signaled = true;
                return InputEvent::Eof;
            }
            return InputEvent::WouldBlock;
        }

        let n = std::cmp::min(buf.len(), self.data.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.data.pop_front().unwrap();
        }
        InputEvent::Data(n)
    }
}

/// An application sink backed by an in-memory buffer, with a capacity cap
/// to exercise partial-drain `output()` behavior and a shared flag so
/// tests can observe end-of-stream delivery.
#[derive(Clone)]
pub struct ByteSink {
    received: Rc<RefCell<Vec<u8>>>,
    eof_seen: Rc<Cell<bool>>,
    capacity: usize,
}

impl ByteSink {
    pub fn new(capacity: usize) -> Self {
        ByteSink {
            received: Rc::new(RefCell::new(Vec::new())),
            eof_seen: Rc::new(Cell::new(false)),
            capacity,
        }
    }

    pub fn received(&self) -> Vec<u8> {
        self.received.borrow().clone()
    }

    pub fn eof_seen(&self) -> bool {
        self.eof_seen.get()
    }
}

impl Sink for ByteSink {
    fn accept(&mut self, bytes: &[u8]) -> SinkEvent {
        if bytes.is_empty() {
            self.eof_seen.set(true);
            return SinkEvent::Accepted(0);
        }

        self.received.borrow_mut().extend_from_slice(bytes);
        SinkEvent::Accepted(bytes.len())
    }

    fn bufspace(&self) -> usize {
        self.capacity
    }
}

/// A clock driven manually by the test, so retransmission-timeout
/// scenarios do not depend on wall-clock sleeps.
#[derive(Clone)]
pub struct FakeClock(Rc<Cell<i64>>);

impl FakeClock {
    pub fn new() -> Self {
        FakeClock(Rc::new(Cell::new(0)))
    }

    pub fn advance(&self, ms: i64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> i64 {
        self.0.get()
    }
}
