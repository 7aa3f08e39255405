//! cTCP: a reliable byte-stream transport over an unreliable datagram
//! channel. This crate implements the per-connection protocol engine — the
//! sliding-window sender, the in-order reassembling receiver, the
//! retransmission timer, and the bilateral teardown handshake — driven by
//! four entry points (`read`, `receive`, `output`, `tick`) that an
//! environment (a UDP demultiplexer, a test harness) invokes.
//!
//! The datagram transport, the demultiplexing driver, and the application
//! source/sink are external collaborators expressed as the `Transport`,
//! `Source`, `Sink`, and `Clock` traits in [`transport`]; this crate does
//! not provide a socket implementation of them.

mod config;
mod connection;
mod err;
mod reassembly;
mod registry;
mod segment;
mod transport;
mod unacked;

pub use config::Config;
pub use connection::{ConnectionState, Outcome, State};
pub use err::Error;
pub use registry::{ConnId, Registry};
pub use segment::{checksum, Segment, FLAG_ACK, FLAG_FIN, HEADER_LEN, MAX_SEG_DATA_SIZE};
pub use transport::{Clock, InputEvent, Sink, SinkEvent, Source, Transport};
