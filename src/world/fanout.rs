//! Broadcast fan-out: owns the outbound sender for every live connection
//! and delivers typed events to one connection, to a set of sessions, or to
//! every logged-in session. Sends never block; each connection's writer
//! task drains its own unbounded queue, which preserves per-connection
//! ordering. A failed send means the connection is already gone and the
//! disconnect path will clean it up.

use std::collections::HashMap;

use log::debug;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::world::events::ServerEvent;
use crate::world::types::SessionId;

/// Transport-level identity of one TCP connection.
pub type ConnId = Uuid;

#[derive(Default)]
pub struct Fanout {
    connections: HashMap<ConnId, UnboundedSender<ServerEvent>>,
    /// Which connection a logged-in session writes to. Bound on login,
    /// unbound on disconnect.
    bindings: HashMap<SessionId, ConnId>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted connection's outbound queue.
    pub fn add_connection(&mut self, conn: ConnId, tx: UnboundedSender<ServerEvent>) {
        self.connections.insert(conn, tx);
    }

    /// Drops a connection and any session binding pointing at it.
    pub fn remove_connection(&mut self, conn: ConnId) {
        self.connections.remove(&conn);
        self.bindings.retain(|_, bound| *bound != conn);
    }

    pub fn bind_session(&mut self, session: SessionId, conn: ConnId) {
        self.bindings.insert(session, conn);
    }

    pub fn unbind_session(&mut self, session: SessionId) {
        self.bindings.remove(&session);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn session_count(&self) -> usize {
        self.bindings.len()
    }

    /// Delivers to one connection, logged-in or not.
    pub fn send_to_conn(&self, conn: ConnId, event: ServerEvent) {
        let Some(tx) = self.connections.get(&conn) else {
            debug!("Dropping event for unknown connection {conn}");
            return;
        };
        if tx.send(event).is_err() {
            debug!("Connection {conn} closed before delivery");
        }
        crate::metrics::inc_broadcasts_out();
    }

    /// Delivers to one logged-in session.
    pub fn send_to_session(&self, session: SessionId, event: ServerEvent) {
        let Some(conn) = self.bindings.get(&session) else {
            debug!("Dropping event for unbound session {session}");
            return;
        };
        self.send_to_conn(*conn, event);
    }

    /// Delivers one event to every session in `members`.
    pub fn send_to_members<'a, I>(&self, members: I, event: &ServerEvent)
    where
        I: IntoIterator<Item = &'a SessionId>,
    {
        for session in members {
            self.send_to_session(*session, event.clone());
        }
    }

    /// Delivers to every logged-in session.
    pub fn broadcast_all(&self, event: &ServerEvent) {
        for session in self.bindings.keys() {
            self.send_to_session(*session, event.clone());
        }
    }
}
