//! Session registry: the owned mappings from connection to live session and
//! from account identity to live session. Sessions are inserted on login and
//! removed on disconnect; nothing else touches these maps. At most one live
//! session may reference a given account.

use std::collections::HashMap;

use log::warn;

use crate::validation;
use crate::world::errors::{AuthError, StoreError};
use crate::world::fanout::ConnId;
use crate::world::geometry::Vec2;
use crate::world::storage::{hash_password, verify_password, WorldStore};
use crate::world::types::{AccountRecord, PlayerSession, SessionId};

pub struct SessionRegistry {
    sessions: HashMap<SessionId, PlayerSession>,
    by_username: HashMap<String, SessionId>,
    by_conn: HashMap<ConnId, SessionId>,
    next_id: SessionId,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            by_username: HashMap::new(),
            by_conn: HashMap::new(),
            next_id: 1,
        }
    }

    /// Checks credentials against the store. The caller only learns
    /// accept/reject; unknown usernames and wrong passwords are the same
    /// failure on purpose.
    pub fn authenticate(
        &self,
        store: &WorldStore,
        username: &str,
        password: &str,
    ) -> Result<AccountRecord, AuthError> {
        let account = match store.get_account(username) {
            Ok(account) => account,
            Err(StoreError::NotFound(_)) => return Err(AuthError::BadCredentials),
            Err(e) => {
                warn!("Account lookup failed for login: {e}");
                return Err(AuthError::Unavailable);
            }
        };
        if !verify_password(&account.password_hash, password) {
            return Err(AuthError::BadCredentials);
        }
        Ok(account)
    }

    /// Creates a new account after shape validation. The new record is
    /// written through synchronously so a crash right after registration
    /// cannot lose the credential.
    pub fn register_account(
        &self,
        store: &WorldStore,
        username: &str,
        password: &str,
        spawn: Vec2,
        district: &str,
        starting_money: i64,
    ) -> Result<AccountRecord, AuthError> {
        validation::validate_username(username)
            .map_err(|e| AuthError::InvalidInput(e.to_string()))?;
        validation::validate_password(password)
            .map_err(|e| AuthError::InvalidInput(e.to_string()))?;

        match store.account_exists(username) {
            Ok(true) => return Err(AuthError::UsernameTaken),
            Ok(false) => {}
            Err(e) => {
                warn!("Account existence check failed: {e}");
                return Err(AuthError::Unavailable);
            }
        }

        let hash = match hash_password(password) {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Password hashing failed during registration: {e}");
                return Err(AuthError::Unavailable);
            }
        };

        let account = AccountRecord::new(username, &hash, spawn, district, starting_money);
        if let Err(e) = store.put_account(account.clone()) {
            warn!("Failed to persist new account {}: {e}", account.username);
            return Err(AuthError::Unavailable);
        }
        Ok(account)
    }

    /// Binds an authenticated account to a connection as a live session.
    /// Rejects when the account already has a session or the connection is
    /// already logged in.
    pub fn login(
        &mut self,
        conn: ConnId,
        account: &AccountRecord,
        max_health: i32,
    ) -> Result<SessionId, AuthError> {
        let key = account.username.to_ascii_lowercase();
        if self.by_username.contains_key(&key) || self.by_conn.contains_key(&conn) {
            return Err(AuthError::AlreadyLoggedIn);
        }

        let id = self.next_id;
        self.next_id += 1;
        let session = PlayerSession::from_account(id, account, max_health);
        self.sessions.insert(id, session);
        self.by_username.insert(key, id);
        self.by_conn.insert(conn, id);
        crate::metrics::inc_logins();
        Ok(id)
    }

    /// Removes the session for a connection, returning it so the caller can
    /// flush its durable fields. The only removal path besides this is
    /// process exit.
    pub fn logout_conn(&mut self, conn: ConnId) -> Option<PlayerSession> {
        let id = self.by_conn.remove(&conn)?;
        let session = self.sessions.remove(&id)?;
        self.by_username
            .remove(&session.username.to_ascii_lowercase());
        Some(session)
    }

    pub fn session(&self, id: SessionId) -> Option<&PlayerSession> {
        self.sessions.get(&id)
    }

    pub fn session_mut(&mut self, id: SessionId) -> Option<&mut PlayerSession> {
        self.sessions.get_mut(&id)
    }

    pub fn session_id_for_conn(&self, conn: ConnId) -> Option<SessionId> {
        self.by_conn.get(&conn).copied()
    }

    pub fn session_id_for_username(&self, username: &str) -> Option<SessionId> {
        self.by_username
            .get(&username.to_ascii_lowercase())
            .copied()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn sessions(&self) -> impl Iterator<Item = &PlayerSession> {
        self.sessions.values()
    }
}
