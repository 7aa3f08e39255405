use log::{debug, trace, warn};

use crate::config::Config;
use crate::reassembly::ReassemblyBuffer;
use crate::segment::{Segment, FLAG_ACK, FLAG_FIN, MAX_SEG_DATA_SIZE};
use crate::transport::{Clock, InputEvent, Sink, SinkEvent, Source, Transport};
use crate::unacked::UnackedQueue;

/// Observable lifecycle of one connection, paralleled by the independent
/// `recv_fin` flag tracking the peer's half of the close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Open,
    FinSent,
    FinAcked,
    Closed,
}

/// What the caller (typically a `Registry`) should do after driving one of
/// the four entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The connection is still live.
    Continue,
    /// The connection has met a destruction condition (§3 Lifecycle) and
    /// must be removed from the registry; its buffers are freed when the
    /// owning `ConnectionState` is dropped.
    Destroy,
}

/// Per-peer protocol state: the sliding-window sender, the in-order
/// reassembling receiver, and the retransmission timer, generalized over
/// the transport/source/sink/clock collaborators an environment supplies.
pub struct ConnectionState<T, S, K, C> {
    transport: T,
    source: S,
    sink: K,
    clock: C,

    state: State,

    next_seqno: u32,
    send_base: u32,
    recv_base: u32,

    send_window_bytes: u32,
    recv_window_bytes: u32,

    unacked: UnackedQueue,
    reassembly: ReassemblyBuffer,

    rt_timeout_ms: i64,
    last_xmit_ms: i64,
    xmit_count: u32,
    max_retransmits: u32,

    sent_fin: bool,
    sent_fin_seqno: u32,
    recv_fin: bool,
    eof_delivered: bool,
}

impl<T: Transport, S: Source, K: Sink, C: Clock> ConnectionState<T, S, K, C> {
    pub fn init(transport: T, source: S, sink: K, clock: C, cfg: Config) -> Self {
        let now = clock.now_ms();
        debug!("connection init: send_window={}B recv_window={}B rt_timeout_ms={}",
            cfg.send_window_bytes(), cfg.recv_window_bytes(), cfg.rt_timeout_ms);

        ConnectionState {
            transport,
            source,
            sink,
            clock,
            state: State::Open,
            next_seqno: 1,
            send_base: 1,
            recv_base: 1,
            send_window_bytes: cfg.send_window_bytes(),
            recv_window_bytes: cfg.recv_window_bytes(),
            unacked: UnackedQueue::new(),
            reassembly: ReassemblyBuffer::new(),
            rt_timeout_ms: cfg.rt_timeout_ms,
            last_xmit_ms: now,
            xmit_count: 0,
            max_retransmits: cfg.max_retransmits,
            sent_fin: false,
            sent_fin_seqno: 0,
            recv_fin: false,
            eof_delivered: false,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    fn in_flight_bytes(&self) -> u32 {
        self.next_seqno.wrapping_sub(self.send_base)
    }

    fn transmit(&mut self, seg: &Segment) -> Outcome {
        let bytes = seg.encode();
        match self.transport.send(&bytes) {
            Ok(_) => Outcome::Continue,
            Err(err) => {
                warn!("transport send failed, destroying connection: {err}");
                Outcome::Destroy
            }
        }
    }

    /// The application may have produced more bytes; segment and transmit
    /// them until the send window is exhausted or the source has nothing
    /// more to offer right now.
    pub fn read(&mut self) -> Outcome {
        loop {
            let available_window = self.send_window_bytes.saturating_sub(self.in_flight_bytes());
            if available_window == 0 {
                break;
            }

            let want = std::cmp::min(available_window as usize, MAX_SEG_DATA_SIZE);
            let mut buf = vec![0u8; want];

            match self.source.poll_input(&mut buf) {
                InputEvent::WouldBlock => break,
                InputEvent::Eof => {
                    if self.sent_fin {
                        break;
                    }

                    let seg = Segment::new(
                        self.next_seqno,
                        self.recv_base,
                        FLAG_ACK | FLAG_FIN,
                        self.recv_window_bytes.min(u16::MAX as u32) as u16,
                        Vec::new(),
                    );

                    trace!("sending FIN seqno={}", self.next_seqno);
                    if self.transmit(&seg) == Outcome::Destroy {
                        return Outcome::Destroy;
                    }

                    let was_empty = self.unacked.is_empty();
                    self.unacked.push_back(seg);
                    self.sent_fin = true;
                    self.sent_fin_seqno = self.next_seqno;
                    self.next_seqno = self.next_seqno.wrapping_add(1);

                    if was_empty {
                        self.last_xmit_ms = self.clock.now_ms();
                        self.xmit_count = 0;
                    }

                    if self.state == State::Open {
                        self.state = State::FinSent;
                        debug!("state -> FinSent");
                    }

                    break;
                }
                InputEvent::Data(n) => {
                    let payload = buf[..n].to_vec();
                    let seg = Segment::new(
                        self.next_seqno,
                        self.recv_base,
                        FLAG_ACK,
                        self.recv_window_bytes.min(u16::MAX as u32) as u16,
                        payload,
                    );

                    trace!("sending data seqno={} len={}", self.next_seqno, n);
                    if self.transmit(&seg) == Outcome::Destroy {
                        return Outcome::Destroy;
                    }

                    let was_empty = self.unacked.is_empty();
                    self.next_seqno = self.next_seqno.wrapping_add(n as u32);
                    self.unacked.push_back(seg);

                    if was_empty {
                        self.last_xmit_ms = self.clock.now_ms();
                        self.xmit_count = 0;
                    }
                }
            }
        }

        Outcome::Continue
    }

    /// A datagram for this connection arrived.
    pub fn receive(&mut self, bytes: &[u8]) -> Outcome {
        let seg = match Segment::decode(bytes) {
            Ok(seg) => seg,
            Err(err) => {
                trace!("dropping malformed segment: {err}");
                return Outcome::Continue;
            }
        };

        if seg.ack() && seg.ackno > self.send_base {
            self.send_base = seg.ackno;
            let removed = self.unacked.drop_acked(seg.ackno);
            if removed > 0 {
                self.xmit_count = 0;
                self.last_xmit_ms = self.clock.now_ms();
            }

            if self.sent_fin
                && self.send_base > self.sent_fin_seqno
                && self.state == State::FinSent
            {
                self.state = State::FinAcked;
                debug!("state -> FinAcked");
            }
        }

        if seg.payload_len() > 0 || seg.fin() {
            let admitted = self.reassembly.insert_unique(seg, self.recv_base);
            trace!("segment admitted into reassembly: {admitted}");

            if self.output() == Outcome::Destroy {
                return Outcome::Destroy;
            }

            let ack = Segment::new(
                self.next_seqno,
                self.recv_base,
                FLAG_ACK,
                self.recv_window_bytes.min(u16::MAX as u32) as u16,
                Vec::new(),
            );
            if self.transmit(&ack) == Outcome::Destroy {
                return Outcome::Destroy;
            }
        }

        if self.sent_fin
            && self.send_base > self.sent_fin_seqno
            && self.recv_fin
            && self.eof_delivered
        {
            debug!("teardown conditions met, destroying connection");
            return Outcome::Destroy;
        }

        Outcome::Continue
    }

    /// The application sink may have capacity; drain whatever contiguous
    /// prefix of the reassembly buffer is ready for delivery.
    pub fn output(&mut self) -> Outcome {
        loop {
            let Some(head) = self.reassembly.front() else {
                break;
            };

            if head.seqno != self.recv_base {
                break;
            }

            if head.fin() && head.payload_len() == 0 {
                match self.sink.accept(&[]) {
                    SinkEvent::Closed => {
                        warn!("application sink closed, destroying connection");
                        return Outcome::Destroy;
                    }
                    SinkEvent::Accepted(_) => {
                        self.recv_fin = true;
                        self.eof_delivered = true;
                        self.recv_base = self.recv_base.wrapping_add(1);
                        self.reassembly.pop_front();
                        debug!("delivered end-of-stream, recv_base={}", self.recv_base);
                    }
                }
                break;
            }

            if self.sink.bufspace() < head.payload_len() {
                break;
            }

            let seg = self.reassembly.pop_front().expect("front checked above");
            let len = seg.payload_len();
            match self.sink.accept(&seg.data) {
                SinkEvent::Closed => {
                    warn!("application sink closed, destroying connection");
                    return Outcome::Destroy;
                }
                SinkEvent::Accepted(_) => {
                    self.recv_base = self.recv_base.wrapping_add(len as u32);
                    trace!("delivered {len} bytes, recv_base={}", self.recv_base);
                }
            }
        }

        Outcome::Continue
    }

    /// A periodic scheduling tick: detect timeout on the oldest unacked
    /// segment and retransmit exactly that one segment (never the whole
    /// window — Go-Back-N is explicitly not implemented here).
    pub fn tick(&mut self) -> Outcome {
        if self.unacked.is_empty() {
            return Outcome::Continue;
        }

        let now = self.clock.now_ms();
        if now - self.last_xmit_ms < self.rt_timeout_ms {
            return Outcome::Continue;
        }

        if self.xmit_count >= self.max_retransmits {
            warn!(
                "retransmission attempts exhausted after {} tries, destroying connection",
                self.xmit_count
            );
            return Outcome::Destroy;
        }

        let bytes = {
            let front = self.unacked.peek_front().expect("checked non-empty above");
            front.segment.encode()
        };

        debug!("retransmitting oldest unacked segment (attempt {})", self.xmit_count + 1);
        if let Err(err) = self.transport.send(&bytes) {
            warn!("transport send failed during retransmit, destroying connection: {err}");
            return Outcome::Destroy;
        }

        if let Some(front) = self.unacked.peek_front_mut() {
            front.xmit_count += 1;
        }
        self.last_xmit_ms = now;
        self.xmit_count += 1;

        Outcome::Continue
    }
}
