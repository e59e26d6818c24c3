//! Test utilities & fixtures.
//! Drives the world core through injected channel connections; no sockets.
//! Helpers are shared across test binaries, so not every one uses them all.
#![allow(dead_code)]

use plaza::config::Config;
use plaza::server::WorldServer;
use plaza::world::events::{ClientEvent, ServerEvent};
use plaza::world::fanout::ConnId;
use plaza::world::types::SessionId;
use tempfile::TempDir;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A world server backed by a fresh temp data dir. Keep the `TempDir` alive
/// for the duration of the test. Must run inside a tokio runtime.
pub fn temp_server() -> (WorldServer, TempDir) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mut cfg = Config::default();
    cfg.storage.data_dir = tmp.path().to_string_lossy().to_string();
    let server = WorldServer::new(cfg).expect("server");
    (server, tmp)
}

/// Like [`temp_server`] but with the caller's config (its `data_dir` is
/// still redirected to the temp dir).
pub fn temp_server_with(mut cfg: Config) -> (WorldServer, TempDir) {
    let tmp = tempfile::tempdir().expect("tempdir");
    cfg.storage.data_dir = tmp.path().to_string_lossy().to_string();
    let server = WorldServer::new(cfg).expect("server");
    (server, tmp)
}

/// One injected connection. Events the server delivers to it pile up in the
/// channel until drained.
pub struct TestClient {
    pub conn: ConnId,
    rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestClient {
    pub fn connect(server: &mut WorldServer) -> Self {
        let conn = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        server.add_connection(conn, tx);
        Self { conn, rx }
    }

    pub fn send(&self, server: &mut WorldServer, event: ClientEvent) {
        server.handle_event(self.conn, event);
    }

    /// Everything delivered since the last drain, in order.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Register a fresh account (which logs straight in) and return its session
/// id. Drains the client's login burst.
pub fn register(server: &mut WorldServer, client: &mut TestClient, username: &str) -> SessionId {
    client.send(
        server,
        ClientEvent::Register {
            username: username.into(),
            password: "hunter22".into(),
        },
    );
    let events = client.drain();
    session_id_from(&events).unwrap_or_else(|| panic!("registration of '{username}' should log in"))
}

/// Log into an existing account and return its session id.
pub fn login(server: &mut WorldServer, client: &mut TestClient, username: &str) -> SessionId {
    client.send(
        server,
        ClientEvent::Login {
            username: username.into(),
            password: "hunter22".into(),
        },
    );
    let events = client.drain();
    session_id_from(&events).unwrap_or_else(|| panic!("login of '{username}' should succeed"))
}

pub fn session_id_from(events: &[ServerEvent]) -> Option<SessionId> {
    events.iter().find_map(|event| match event {
        ServerEvent::LoginSuccess {
            account_snapshot, ..
        } => Some(account_snapshot.id),
        _ => None,
    })
}

/// The last `updateMoney` amount in a batch, if any.
pub fn last_money(events: &[ServerEvent]) -> Option<i64> {
    events.iter().rev().find_map(|event| match event {
        ServerEvent::UpdateMoney { amount } => Some(*amount),
        _ => None,
    })
}

/// Usernames carried by the last `currentPlayers` list in a batch.
pub fn current_player_names(events: &[ServerEvent]) -> Option<Vec<String>> {
    events.iter().rev().find_map(|event| match event {
        ServerEvent::CurrentPlayers { list } => {
            Some(list.iter().map(|p| p.username.clone()).collect())
        }
        _ => None,
    })
}

/// All chat lines in a batch as `(sender id, text)`.
pub fn chat_lines(events: &[ServerEvent]) -> Vec<(SessionId, String)> {
    events
        .iter()
        .filter_map(|event| match event {
            ServerEvent::ChatMessage { id, text, .. } => Some((*id, text.clone())),
            _ => None,
        })
        .collect()
}

pub fn has_auth_error(events: &[ServerEvent]) -> bool {
    events
        .iter()
        .any(|event| matches!(event, ServerEvent::AuthError { .. }))
}
