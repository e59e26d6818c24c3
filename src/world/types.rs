//! Durable records, live session state, and the wire-facing player snapshot.
//! Records are bincode-encoded into sled and carry a schema version checked
//! on read; live state exists only for the lifetime of a connection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::world::geometry::Vec2;

pub const ACCOUNT_SCHEMA_VERSION: u8 = 1;
pub const PLOT_SCHEMA_VERSION: u8 = 1;
pub const ITEM_SCHEMA_VERSION: u8 = 1;

/// Identifies one live session for the lifetime of its connection.
pub type SessionId = u64;

/// Reserved sender id for system-originated chat lines.
pub const SYSTEM_CHAT_ID: SessionId = 0;
pub const SYSTEM_CHAT_COLOR: &str = "#ffd166";
pub const PLAYER_CHAT_COLOR: &str = "#e8e8e8";

/// Durable account state. The key is the lowercase username; everything a
/// player keeps between connections lives here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountRecord {
    pub username: String,
    pub password_hash: String,
    pub x: f32,
    pub y: f32,
    pub district: String,
    pub money: i64,
    #[serde(default)]
    pub item: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl AccountRecord {
    pub fn new(
        username: &str,
        password_hash: &str,
        spawn: Vec2,
        district: &str,
        starting_money: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            x: spawn.x,
            y: spawn.y,
            district: district.to_string(),
            money: starting_money,
            item: None,
            created_at: now,
            last_login: now,
            updated_at: now,
            schema_version: ACCOUNT_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// One placed piece of furniture inside a plot interior. Placements are
/// append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FurniturePlacement {
    pub item: String,
    pub color: String,
    pub x: f32,
    pub y: f32,
}

/// A purchasable plot in the housing district. `owner` moves from `None` to
/// `Some` exactly once and never back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlotRecord {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub price: i64,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub furniture: Vec<FurniturePlacement>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl PlotRecord {
    pub fn new(id: &str, x: f32, y: f32, price: i64) -> Self {
        Self {
            id: id.to_string(),
            x,
            y,
            price,
            owner: None,
            furniture: Vec::new(),
            updated_at: Utc::now(),
            schema_version: PLOT_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn door_position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// A catalog entry: read-mostly, seeded at first startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRecord {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub description: String,
    pub damage: i32,
    pub range: f32,
    pub schema_version: u8,
}

impl ItemRecord {
    pub fn new(id: &str, name: &str, price: i64, description: &str, damage: i32, range: f32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price,
            description: description.to_string(),
            damage,
            range,
            schema_version: ITEM_SCHEMA_VERSION,
        }
    }
}

/// Live, in-memory state for one connected player. Wraps the account's
/// durable fields plus combat and timing state that never persists.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    pub id: SessionId,
    pub username: String,
    pub position: Vec2,
    pub district: String,
    pub money: i64,
    pub item: Option<String>,
    pub health: i32,
    pub max_health: i32,
    pub battle_mode: Option<String>,
    pub team: Option<String>,
    /// Set on every district change; drives the boundary-crossing cooldown.
    pub last_district_change: Option<Instant>,
}

impl PlayerSession {
    pub fn from_account(id: SessionId, account: &AccountRecord, max_health: i32) -> Self {
        Self {
            id,
            username: account.username.clone(),
            position: account.position(),
            district: account.district.clone(),
            money: account.money,
            item: account.item.clone(),
            health: max_health,
            max_health,
            battle_mode: None,
            team: None,
            last_district_change: None,
        }
    }

    /// Debits `amount` if the balance covers it. The balance can never go
    /// negative through this path.
    pub fn debit(&mut self, amount: i64) -> bool {
        if self.money < amount {
            return false;
        }
        self.money -= amount;
        true
    }

    pub fn credit(&mut self, amount: i64) {
        self.money += amount;
    }

    /// Copies the durable fields back onto the account for persistence.
    pub fn flush_into(&self, account: &mut AccountRecord) {
        account.x = self.position.x;
        account.y = self.position.y;
        account.district = self.district.clone();
        account.money = self.money;
        account.item = self.item.clone();
        account.touch();
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            username: self.username.clone(),
            x: self.position.x,
            y: self.position.y,
            district: self.district.clone(),
            money: self.money,
            item: self.item.clone(),
            health: self.health.max(0),
            max_health: self.max_health,
        }
    }
}

/// The player shape clients see in `currentPlayers`, `newPlayer`,
/// `playerMoved`, and `playerUpdate` payloads. Health is clamped at zero
/// before it ever reaches the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: SessionId,
    pub username: String,
    pub x: f32,
    pub y: f32,
    pub district: String,
    pub money: i64,
    pub item: Option<String>,
    pub health: i32,
    pub max_health: i32,
}
