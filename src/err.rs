/// Failure modes the core reacts to. None of these are surfaced to the
/// application through a return value: a `Malformed` segment is dropped
/// silently, and every other variant is terminal for the owning connection
/// (see `ConnectionState::destroy` call sites).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed segment: {0}")]
    Malformed(&'static str),

    #[error("transport send failed")]
    TransportSend,

    #[error("application sink closed")]
    SinkClosed,

    #[error("retransmission attempts exhausted after {0} tries")]
    RetransmitExhausted(u32),

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
