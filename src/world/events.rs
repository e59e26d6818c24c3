//! Typed wire events. Each JSON line on a connection is one envelope with a
//! camelCase `type` tag; the enums here are the single source of truth for
//! the protocol vocabulary. The framing layer stays thin: the core consumes
//! `ClientEvent` values and emits `ServerEvent` values.

use serde::{Deserialize, Serialize};

use crate::world::geometry::Vec2;
use crate::world::types::{FurniturePlacement, ItemRecord, PlayerSnapshot, PlotRecord, SessionId};

/// Everything a client may send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    Register {
        username: String,
        password: String,
    },
    Login {
        username: String,
        password: String,
    },
    Movement {
        x: f32,
        y: f32,
    },
    JoinDistrict {
        target: String,
        #[serde(default)]
        spawn_pos: Option<Vec2>,
    },
    BuyHouse {
        plot_id: String,
    },
    EnterHouse {
        plot_id: String,
    },
    LeaveHouse,
    PlaceFurniture {
        house_id: String,
        item: FurniturePlacement,
    },
    BuyItem {
        item_id: String,
    },
    JoinBattle {
        mode: String,
        #[serde(default)]
        team: Option<String>,
    },
    Attack {
        target_id: SessionId,
    },
    SubmitQuizAnswer {
        num1: i64,
        num2: i64,
        answer: i64,
    },
    ChatMessage {
        text: String,
    },
}

/// Everything the server may deliver, to one connection, a district, or all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    AuthError {
        message: String,
    },
    LoginSuccess {
        account_snapshot: PlayerSnapshot,
        catalog: Vec<ItemRecord>,
    },
    UpdateMoney {
        amount: i64,
    },
    HouseData {
        all_plots: Vec<PlotRecord>,
    },
    HouseUpdate {
        plot: PlotRecord,
    },
    CurrentPlayers {
        list: Vec<PlayerSnapshot>,
    },
    NewPlayer {
        session: PlayerSnapshot,
    },
    PlayerMoved {
        session: PlayerSnapshot,
    },
    PlayerUpdate {
        session: PlayerSnapshot,
    },
    PlayerDisconnected {
        id: SessionId,
    },
    PlayerChangedDistrict {
        list: Vec<PlayerSnapshot>,
    },
    SetDistrict {
        name: String,
    },
    ChatMessage {
        id: SessionId,
        text: String,
        color: String,
    },
    ItemBought {
        item: Option<ItemRecord>,
        success: bool,
    },
    QuizResult {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reward: Option<i64>,
    },
    PlayerHit {
        target_id: SessionId,
        hp: i32,
        attacker_id: SessionId,
    },
    PlayerRespawned,
}
