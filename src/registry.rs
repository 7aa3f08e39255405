use std::collections::HashMap;

use log::debug;

use crate::config::Config;
use crate::connection::{ConnectionState, Outcome};
use crate::transport::{Clock, Sink, Source, Transport};

/// Opaque handle identifying one live connection in a `Registry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

/// The process-wide collection of live connections, keyed by `ConnId` so
/// `tick_all` can iterate without holding an intrusive pointer into each
/// connection. Destruction during iteration is made safe by snapshotting
/// the key set before the sweep, mirroring the `to_be_deleted` staging
/// vector the teacher crate used around its own per-tick connection loop.
#[derive(Default)]
pub struct Registry<T, S, K, C> {
    next_id: u64,
    connections: HashMap<ConnId, ConnectionState<T, S, K, C>>,
}

impl<T: Transport, S: Source, K: Sink, C: Clock> Registry<T, S, K, C> {
    pub fn new() -> Self {
        Registry {
            next_id: 0,
            connections: HashMap::new(),
        }
    }

    /// Creates a connection bound to the given collaborators and registers
    /// it; initial sequence numbers are 1 per §3.
    pub fn init(&mut self, transport: T, source: S, sink: K, clock: C, cfg: Config) -> ConnId {
        let id = ConnId(self.next_id);
        self.next_id += 1;

        self.connections
            .insert(id, ConnectionState::init(transport, source, sink, clock, cfg));
        debug!("registered connection {id:?}, {} live", self.connections.len());

        id
    }

    /// Removes and drops a connection, freeing its buffers and releasing
    /// its transport handle. Idempotent: a second call on an already-gone
    /// id is a harmless no-op, though the environment contract (§6) says
    /// it should never issue one.
    pub fn destroy(&mut self, id: ConnId) -> bool {
        let existed = self.connections.remove(&id).is_some();
        if existed {
            debug!("destroyed connection {id:?}, {} live", self.connections.len());
        }
        existed
    }

    pub fn get_mut(&mut self, id: ConnId) -> Option<&mut ConnectionState<T, S, K, C>> {
        self.connections.get_mut(&id)
    }

    pub fn contains(&self, id: ConnId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Drives `read` for one connection, destroying it if the outcome
    /// demands it.
    pub fn read(&mut self, id: ConnId) {
        self.drive(id, ConnectionState::read);
    }

    /// Drives `receive` for one connection with an inbound datagram,
    /// destroying it if the outcome demands it.
    pub fn receive(&mut self, id: ConnId, bytes: &[u8]) {
        self.drive(id, |conn| conn.receive(bytes));
    }

    /// Drives `output` for one connection, destroying it if the outcome
    /// demands it.
    pub fn output(&mut self, id: ConnId) {
        self.drive(id, ConnectionState::output);
    }

    fn drive(
        &mut self,
        id: ConnId,
        f: impl FnOnce(&mut ConnectionState<T, S, K, C>) -> Outcome,
    ) {
        let outcome = match self.connections.get_mut(&id) {
            Some(conn) => f(conn),
            None => return,
        };

        if outcome == Outcome::Destroy {
            self.destroy(id);
        }
    }

    /// A periodic scheduling tick: iterates every live connection,
    /// snapshotting the key set first so a connection destroying itself
    /// mid-sweep cannot invalidate the iteration.
    pub fn tick_all(&mut self) {
        let ids: Vec<ConnId> = self.connections.keys().copied().collect();

        for id in ids {
            let outcome = match self.connections.get_mut(&id) {
                Some(conn) => conn.tick(),
                None => continue,
            };

            if outcome == Outcome::Destroy {
                self.destroy(id);
            }
        }
    }
}
