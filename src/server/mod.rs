//! # World Server
//!
//! The authoritative core: owns every live session, district membership,
//! plot, and catalog entry, and processes all inbound client events on a
//! single worker so check-then-mutate sequences are never interleaved.
//!
//! ## Architecture
//!
//! Each TCP connection gets two small tasks: a reader that parses one JSON
//! event per line and forwards it to the worker, and a writer that drains
//! the connection's outbound queue back onto the socket. The worker loop in
//! [`WorldServer::run`] is the only place state is mutated; handlers are
//! synchronous and finish one event before the next is picked up. Durable
//! deltas are handed to the persistence writer before the corresponding
//! broadcasts go out, so a crash can only lose the most recent unpersisted
//! delta, never reorder it.
//!
//! Unknown or invalid routing targets (bad district names, missing plots,
//! attacks across districts) are dropped silently and logged at debug; auth
//! and economy failures travel back to the originating connection only.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::Config;
use crate::logutil::escape_log;
use crate::validation::sanitize_chat_text;
use crate::world::arbiter::{Arbiter, AttackOutcome, AttackerProfile};
use crate::world::districts::DistrictManager;
use crate::world::errors::EconomyError;
use crate::world::events::{ClientEvent, ServerEvent};
use crate::world::fanout::{ConnId, Fanout};
use crate::world::geometry::{
    district_geometry, interior_plot_id, Vec2, DISTRICT_ARENA, DISTRICT_HOUSING, DISTRICT_PLAZA,
    HOUSE_DISTRICT_PREFIX,
};
use crate::world::movement::{MoveOutcome, MovementResolver};
use crate::world::persist::{start_writer, PersistHandle};
use crate::world::registry::SessionRegistry;
use crate::world::storage::WorldStore;
use crate::world::types::{
    FurniturePlacement, ItemRecord, PlayerSession, PlayerSnapshot, PlotRecord, SessionId,
    PLAYER_CHAT_COLOR, SYSTEM_CHAT_COLOR, SYSTEM_CHAT_ID,
};

/// Where a session lands inside a plot interior when no explicit spawn is
/// given. Interior layouts are client-side; the server only needs a stable
/// point.
const INTERIOR_SPAWN: Vec2 = Vec2::new(400.0, 470.0);

/// What the per-connection reader tasks deliver to the worker loop.
enum ConnEvent {
    Inbound(ConnId, ClientEvent),
    Closed(ConnId),
}

pub struct WorldServer {
    config: Config,
    store: Arc<WorldStore>,
    registry: SessionRegistry,
    districts: DistrictManager,
    fanout: Fanout,
    resolver: MovementResolver,
    arbiter: Arbiter,
    persist: PersistHandle,
    /// Authoritative plot state; the store holds the durable copy.
    plots: HashMap<String, PlotRecord>,
    catalog: HashMap<String, ItemRecord>,
}

impl WorldServer {
    /// Opens the store (seeding the canonical world on first run), loads
    /// plots and catalog into memory, and starts the persistence writer.
    /// Must be called from within a tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        let store = Arc::new(
            WorldStore::open(&config.storage.data_dir).context("failed to open world store")?,
        );

        let mut plots = HashMap::new();
        for plot in store.all_plots().context("failed to load plots")? {
            plots.insert(plot.id.clone(), plot);
        }
        let mut catalog = HashMap::new();
        for item in store.all_items().context("failed to load catalog")? {
            catalog.insert(item.id.clone(), item);
        }
        info!(
            "World loaded: {} plots, {} catalog items, {} accounts",
            plots.len(),
            catalog.len(),
            store.account_count()
        );

        let persist = start_writer(Arc::clone(&store));
        let districts = DistrictManager::new(plots.keys().cloned());
        let resolver = MovementResolver::new(
            config.game.player_radius,
            config.game.transfer_cooldown_ms,
        );
        let arbiter = Arbiter {
            quiz_reward: config.game.quiz_reward,
            kill_reward: config.game.kill_reward,
            default_damage: config.game.default_damage,
            default_range: config.game.default_range,
        };

        Ok(Self {
            config,
            store,
            registry: SessionRegistry::new(),
            districts,
            fanout: Fanout::new(),
            resolver,
            arbiter,
            persist,
            plots,
            catalog,
        })
    }

    /// Accept loop plus the single event worker. Runs until ctrl-c.
    pub async fn run(mut self) -> Result<()> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        info!("World server listening on {}", addr);

        let (conn_tx, mut conn_rx) = mpsc::unbounded_channel::<ConnEvent>();
        let mut stats_interval = tokio::time::interval(Duration::from_secs(60));
        stats_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            if self.fanout.connection_count() >= self.config.server.max_sessions {
                                warn!("Refusing connection from {}: session limit reached", peer);
                                drop(stream);
                                continue;
                            }
                            let conn = Uuid::new_v4();
                            debug!("Connection {} accepted from {}", conn, peer);
                            let (out_tx, out_rx) = mpsc::unbounded_channel();
                            self.fanout.add_connection(conn, out_tx);
                            spawn_connection(conn, stream, out_rx, conn_tx.clone());
                        }
                        Err(e) => warn!("Accept failed: {}", e),
                    }
                }

                msg = conn_rx.recv() => {
                    match msg {
                        Some(ConnEvent::Inbound(conn, event)) => self.handle_event(conn, event),
                        Some(ConnEvent::Closed(conn)) => self.handle_disconnect(conn),
                        None => break,
                    }
                }

                _ = stats_interval.tick() => {
                    let stats = crate::metrics::snapshot();
                    debug!(
                        "server stats: sessions={} events_in={} broadcasts_out={} persist_writes={} persist_failures={} logins={} disconnects={}",
                        self.registry.session_count(),
                        stats.events_in,
                        stats.broadcasts_out,
                        stats.persist_writes,
                        stats.persist_failures,
                        stats.logins,
                        stats.disconnects,
                    );
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown().await
    }

    /// Graceful stop without the accept loop: flushes live sessions and
    /// waits for the persistence writer to release the store.
    pub async fn stop(mut self) -> Result<()> {
        self.shutdown().await
    }

    async fn shutdown(&mut self) -> Result<()> {
        let live = self.registry.session_count();
        if live > 0 {
            info!("Flushing {} live sessions", live);
        }
        let ids: Vec<SessionId> = self.registry.sessions().map(|s| s.id).collect();
        for id in ids {
            self.persist_session_account(id);
        }
        self.persist.shutdown().await;
        info!("World server shutdown complete");
        Ok(())
    }

    /// Registers an outbound queue for a connection. The accept loop does
    /// this for TCP connections; tests inject channels directly.
    pub fn add_connection(&mut self, conn: ConnId, tx: mpsc::UnboundedSender<ServerEvent>) {
        self.fanout.add_connection(conn, tx);
    }

    /// Routes one inbound event. This is the only entry point that mutates
    /// world state.
    pub fn handle_event(&mut self, conn: ConnId, event: ClientEvent) {
        crate::metrics::inc_events_in();
        match event {
            ClientEvent::Register { username, password } => {
                self.handle_register(conn, &username, &password)
            }
            ClientEvent::Login { username, password } => {
                self.handle_login(conn, &username, &password)
            }
            ClientEvent::Movement { x, y } => self.handle_movement(conn, Vec2::new(x, y)),
            ClientEvent::JoinDistrict { target, spawn_pos } => {
                self.handle_join_district(conn, &target, spawn_pos)
            }
            ClientEvent::BuyHouse { plot_id } => self.handle_buy_house(conn, &plot_id),
            ClientEvent::EnterHouse { plot_id } => self.handle_enter_house(conn, &plot_id),
            ClientEvent::LeaveHouse => self.handle_leave_house(conn),
            ClientEvent::PlaceFurniture { house_id, item } => {
                self.handle_place_furniture(conn, &house_id, item)
            }
            ClientEvent::BuyItem { item_id } => self.handle_buy_item(conn, &item_id),
            ClientEvent::JoinBattle { mode, team } => self.handle_join_battle(conn, mode, team),
            ClientEvent::Attack { target_id } => self.handle_attack(conn, target_id),
            ClientEvent::SubmitQuizAnswer { num1, num2, answer } => {
                self.handle_quiz(conn, num1, num2, answer)
            }
            ClientEvent::ChatMessage { text } => self.handle_chat(conn, &text),
        }
    }

    /// Tears down a closed connection: flush the session's durable fields,
    /// drop its memberships, and tell its district peers.
    pub fn handle_disconnect(&mut self, conn: ConnId) {
        let Some(session) = self.registry.logout_conn(conn) else {
            self.fanout.remove_connection(conn);
            debug!("Connection {} closed before login", conn);
            return;
        };

        let id = session.id;
        let username = session.username.clone();
        self.districts.remove(id);
        self.persist_departed_session(&session);
        self.fanout.unbind_session(id);
        self.fanout.remove_connection(conn);

        let peers = self.districts.members_of(&session.district);
        self.fanout
            .send_to_members(&peers, &ServerEvent::PlayerDisconnected { id });

        crate::metrics::inc_disconnects();
        info!("User {} disconnected (session {})", username, id);
    }

    // ----- auth -----

    fn handle_register(&mut self, conn: ConnId, username: &str, password: &str) {
        let spawn = default_spawn(DISTRICT_PLAZA);
        let account = match self.registry.register_account(
            &self.store,
            username,
            password,
            spawn,
            DISTRICT_PLAZA,
            self.config.game.starting_money,
        ) {
            Ok(account) => account,
            Err(e) => {
                debug!(
                    "Registration rejected for '{}': {}",
                    escape_log(username),
                    e
                );
                self.fanout.send_to_conn(
                    conn,
                    ServerEvent::AuthError {
                        message: e.to_string(),
                    },
                );
                return;
            }
        };
        info!("Registered new account '{}'", account.username);

        // A fresh registration logs straight in.
        match self.registry.login(conn, &account, self.config.game.max_health) {
            Ok(id) => self.finish_login(conn, id),
            Err(e) => self.fanout.send_to_conn(
                conn,
                ServerEvent::AuthError {
                    message: e.to_string(),
                },
            ),
        }
    }

    fn handle_login(&mut self, conn: ConnId, username: &str, password: &str) {
        let mut account = match self.registry.authenticate(&self.store, username, password) {
            Ok(account) => account,
            Err(e) => {
                debug!("Login rejected for '{}': {}", escape_log(username), e);
                self.fanout.send_to_conn(
                    conn,
                    ServerEvent::AuthError {
                        message: e.to_string(),
                    },
                );
                return;
            }
        };

        match self.registry.login(conn, &account, self.config.game.max_health) {
            Ok(id) => {
                account.last_login = chrono::Utc::now();
                self.persist.save_account(account);
                self.finish_login(conn, id);
            }
            Err(e) => self.fanout.send_to_conn(
                conn,
                ServerEvent::AuthError {
                    message: e.to_string(),
                },
            ),
        }
    }

    /// Shared tail of login and register: bind the connection, deliver the
    /// account snapshot and catalog, then join the last-known district.
    fn finish_login(&mut self, conn: ConnId, id: SessionId) {
        self.fanout.bind_session(id, conn);

        let (snapshot, target, spawn) = {
            let Some(session) = self.registry.session(id) else {
                return;
            };
            if self.districts.is_valid_target(&session.district) {
                (
                    session.snapshot(),
                    session.district.clone(),
                    Some(session.position),
                )
            } else {
                warn!(
                    "Account '{}' has unknown stored district '{}', spawning in {}",
                    session.username,
                    escape_log(&session.district),
                    DISTRICT_PLAZA
                );
                (session.snapshot(), DISTRICT_PLAZA.to_string(), None)
            }
        };

        let mut catalog: Vec<ItemRecord> = self.catalog.values().cloned().collect();
        catalog.sort_by(|a, b| a.id.cmp(&b.id));
        info!("User {} logged in (session {})", snapshot.username, id);
        self.fanout.send_to_conn(
            conn,
            ServerEvent::LoginSuccess {
                account_snapshot: snapshot,
                catalog,
            },
        );

        self.transfer_session(id, &target, spawn);
    }

    // ----- movement and districts -----

    fn handle_movement(&mut self, conn: ConnId, requested: Vec2) {
        let Some(id) = self.registry.session_id_for_conn(conn) else {
            return;
        };
        let (district, current, last_change) = {
            let Some(session) = self.registry.session(id) else {
                return;
            };
            (
                session.district.clone(),
                session.position,
                session.last_district_change,
            )
        };

        match self
            .resolver
            .resolve(&district, current, requested, last_change, Instant::now())
        {
            MoveOutcome::Blocked => {
                debug!("Session {} movement fully obstructed", id);
            }
            MoveOutcome::Moved(position) => {
                let Some(session) = self.registry.session_mut(id) else {
                    return;
                };
                session.position = position;
                let snapshot = session.snapshot();
                let peers: Vec<SessionId> = self
                    .districts
                    .members_of(&district)
                    .into_iter()
                    .filter(|m| *m != id)
                    .collect();
                self.fanout
                    .send_to_members(&peers, &ServerEvent::PlayerMoved { session: snapshot });
            }
            MoveOutcome::Crossed { target, spawn } => {
                debug!("Session {} crossed {} -> {}", id, district, target);
                self.transfer_session(id, target, Some(spawn));
            }
        }
    }

    fn handle_join_district(&mut self, conn: ConnId, target: &str, spawn: Option<Vec2>) {
        let Some(id) = self.registry.session_id_for_conn(conn) else {
            return;
        };
        self.transfer_session(id, target, spawn);
    }

    /// Moves a session between districts in one atomic sequence: departure
    /// notice to the old district, position update, membership move, arrival
    /// notice to the new district, then the mover's full peer-list
    /// replacement. Invalid targets are dropped silently.
    fn transfer_session(&mut self, id: SessionId, target: &str, spawn: Option<Vec2>) {
        if !self.districts.is_valid_target(target) {
            debug!(
                "Ignoring transfer of session {} to invalid district '{}'",
                id,
                escape_log(target)
            );
            return;
        }

        let previous = self.districts.remove(id);
        let district_changed = previous.as_deref() != Some(target);

        if let Some(prev) = previous.as_deref() {
            let remaining = self.districts.members_of(prev);
            if !remaining.is_empty() {
                let list = self.snapshots_for(&remaining);
                self.fanout
                    .send_to_members(&remaining, &ServerEvent::PlayerChangedDistrict { list });
            }
        }

        {
            let Some(session) = self.registry.session_mut(id) else {
                return;
            };
            session.district = target.to_string();
            if let Some(position) = spawn {
                session.position = position;
            } else if district_changed {
                session.position = default_spawn(target);
            }
            if district_changed {
                session.last_district_change = Some(Instant::now());
            }
        }

        self.districts.move_session(id, target);

        if let Some(snapshot) = self.registry.session(id).map(|s| s.snapshot()) {
            let others: Vec<SessionId> = self
                .districts
                .members_of(target)
                .into_iter()
                .filter(|m| *m != id)
                .collect();
            self.fanout
                .send_to_members(&others, &ServerEvent::NewPlayer { session: snapshot });
        }

        self.fanout.send_to_session(
            id,
            ServerEvent::SetDistrict {
                name: target.to_string(),
            },
        );
        if target == DISTRICT_HOUSING {
            self.fanout.send_to_session(
                id,
                ServerEvent::HouseData {
                    all_plots: self.plots_sorted(),
                },
            );
        }
        let list = self.snapshots_of(target);
        self.fanout
            .send_to_session(id, ServerEvent::CurrentPlayers { list });
    }

    // ----- housing -----

    fn handle_buy_house(&mut self, conn: ConnId, plot_id: &str) {
        let Some(id) = self.registry.session_id_for_conn(conn) else {
            return;
        };
        let Some(plot) = self.plots.get_mut(plot_id) else {
            let err = EconomyError::UnknownPlot(escape_log(plot_id));
            debug!("Plot purchase rejected for session {}: {}", id, err);
            self.system_chat_to_conn(conn, format!("Purchase failed: {}", err));
            return;
        };
        let Some(session) = self.registry.session_mut(id) else {
            return;
        };

        match self.arbiter.buy_plot(session, plot) {
            Ok(()) => {
                let buyer = session.username.clone();
                let balance = session.money;
                let updated = plot.clone();

                self.persist.save_plot(updated.clone());
                self.persist_session_account(id);

                self.fanout
                    .send_to_session(id, ServerEvent::UpdateMoney { amount: balance });
                self.fanout
                    .broadcast_all(&ServerEvent::HouseUpdate { plot: updated });
                self.system_chat(
                    DISTRICT_HOUSING,
                    format!("{} bought {}!", buyer, plot_id),
                );
                info!("User {} bought plot {}", buyer, plot_id);
            }
            Err(e) => {
                debug!("Plot purchase rejected for session {}: {}", id, e);
                self.system_chat_to_conn(conn, format!("Purchase failed: {}", e));
            }
        }
    }

    fn handle_enter_house(&mut self, conn: ConnId, plot_id: &str) {
        let Some(id) = self.registry.session_id_for_conn(conn) else {
            return;
        };
        if !self.plots.contains_key(plot_id) {
            debug!(
                "Session {} tried to enter unknown plot '{}'",
                id,
                escape_log(plot_id)
            );
            return;
        }
        let target = format!("{}{}", HOUSE_DISTRICT_PREFIX, plot_id);
        self.transfer_session(id, &target, Some(INTERIOR_SPAWN));
    }

    fn handle_leave_house(&mut self, conn: ConnId) {
        let Some(id) = self.registry.session_id_for_conn(conn) else {
            return;
        };
        let Some(session) = self.registry.session(id) else {
            return;
        };
        let Some(plot_id) = interior_plot_id(&session.district) else {
            debug!("Session {} sent leaveHouse outside an interior", id);
            return;
        };
        let door = self.plots.get(plot_id).map(|plot| plot.door_position());
        self.transfer_session(id, DISTRICT_HOUSING, door);
    }

    fn handle_place_furniture(&mut self, conn: ConnId, house_id: &str, item: FurniturePlacement) {
        let Some(id) = self.registry.session_id_for_conn(conn) else {
            return;
        };
        let Some(plot) = self.plots.get_mut(house_id) else {
            let err = EconomyError::UnknownPlot(escape_log(house_id));
            debug!("Furniture placement rejected for session {}: {}", id, err);
            self.system_chat_to_conn(conn, format!("Placement failed: {}", err));
            return;
        };
        let Some(session) = self.registry.session(id) else {
            return;
        };

        match self.arbiter.place_furniture(session, plot, item) {
            Ok(()) => {
                let updated = plot.clone();
                self.persist.save_plot(updated.clone());
                self.fanout
                    .broadcast_all(&ServerEvent::HouseUpdate { plot: updated });
            }
            Err(e) => {
                debug!("Furniture placement rejected for session {}: {}", id, e);
                self.system_chat_to_conn(conn, format!("Placement failed: {}", e));
            }
        }
    }

    // ----- economy -----

    fn handle_buy_item(&mut self, conn: ConnId, item_id: &str) {
        let Some(id) = self.registry.session_id_for_conn(conn) else {
            return;
        };
        let Some(item) = self.catalog.get(item_id).cloned() else {
            debug!(
                "Item purchase rejected for session {}: {}",
                id,
                EconomyError::UnknownItem(escape_log(item_id))
            );
            self.fanout.send_to_conn(
                conn,
                ServerEvent::ItemBought {
                    item: None,
                    success: false,
                },
            );
            return;
        };
        let Some(session) = self.registry.session_mut(id) else {
            return;
        };

        match self.arbiter.buy_item(session, &item) {
            Ok(()) => {
                let buyer = session.username.clone();
                let balance = session.money;
                let district = session.district.clone();
                let snapshot = session.snapshot();

                self.persist_session_account(id);
                self.fanout.send_to_session(
                    id,
                    ServerEvent::ItemBought {
                        item: Some(item.clone()),
                        success: true,
                    },
                );
                self.fanout
                    .send_to_session(id, ServerEvent::UpdateMoney { amount: balance });
                let members = self.districts.members_of(&district);
                self.fanout
                    .send_to_members(&members, &ServerEvent::PlayerUpdate { session: snapshot });
                self.system_chat(&district, format!("{} bought a {}!", buyer, item.name));
            }
            Err(e) => {
                debug!("Item purchase rejected for session {}: {}", id, e);
                self.fanout.send_to_conn(
                    conn,
                    ServerEvent::ItemBought {
                        item: Some(item),
                        success: false,
                    },
                );
            }
        }
    }

    fn handle_quiz(&mut self, conn: ConnId, num1: i64, num2: i64, answer: i64) {
        let Some(id) = self.registry.session_id_for_conn(conn) else {
            return;
        };
        match self.arbiter.grade_quiz(num1, num2, answer) {
            Some(reward) => {
                let Some(session) = self.registry.session_mut(id) else {
                    return;
                };
                session.credit(reward);
                let balance = session.money;

                self.persist_session_account(id);
                self.fanout.send_to_session(
                    id,
                    ServerEvent::QuizResult {
                        success: true,
                        reward: Some(reward),
                    },
                );
                self.fanout
                    .send_to_session(id, ServerEvent::UpdateMoney { amount: balance });
            }
            None => {
                self.fanout.send_to_session(
                    id,
                    ServerEvent::QuizResult {
                        success: false,
                        reward: None,
                    },
                );
            }
        }
    }

    // ----- combat -----

    fn handle_join_battle(&mut self, conn: ConnId, mode: String, team: Option<String>) {
        let Some(id) = self.registry.session_id_for_conn(conn) else {
            return;
        };
        {
            let Some(session) = self.registry.session_mut(id) else {
                return;
            };
            session.battle_mode = Some(mode);
            session.team = team;
            session.health = session.max_health;
        }
        self.transfer_session(id, DISTRICT_ARENA, None);
    }

    fn handle_attack(&mut self, conn: ConnId, target_id: SessionId) {
        let Some(attacker_id) = self.registry.session_id_for_conn(conn) else {
            return;
        };
        if attacker_id == target_id {
            debug!("Session {} tried to attack itself", attacker_id);
            return;
        }

        let (district, profile) = {
            let Some(attacker) = self.registry.session(attacker_id) else {
                return;
            };
            let (damage, range) = self
                .arbiter
                .weapon_stats(attacker.item.as_deref(), &self.catalog);
            (
                attacker.district.clone(),
                AttackerProfile {
                    id: attacker_id,
                    position: attacker.position,
                    damage,
                    range,
                    battle_mode: attacker.battle_mode.clone(),
                    team: attacker.team.clone(),
                },
            )
        };

        let Some(geo) = district_geometry(&district) else {
            debug!("Session {} attacked outside any fixed district", attacker_id);
            return;
        };
        if !geo.combat {
            debug!("Session {} attacked outside the combat district", attacker_id);
            return;
        }
        let Some(respawn) = geo.respawn else {
            return;
        };
        if self.districts.location_of(target_id) != Some(district.as_str()) {
            debug!(
                "Session {} attacked session {} in another district",
                attacker_id, target_id
            );
            return;
        }

        let Some(target) = self.registry.session_mut(target_id) else {
            return;
        };
        let outcome = self.arbiter.resolve_attack(&profile, target, respawn);
        let target_snapshot = target.snapshot();
        let target_name = target.username.clone();

        let members = self.districts.members_of(&district);
        match outcome {
            AttackOutcome::FriendlyFire => {
                debug!(
                    "Session {} attack on {} blocked: same team",
                    attacker_id, target_id
                );
            }
            AttackOutcome::OutOfRange => {
                debug!(
                    "Session {} attack on {} out of range",
                    attacker_id, target_id
                );
            }
            AttackOutcome::Hit { hp } => {
                self.fanout.send_to_members(
                    &members,
                    &ServerEvent::PlayerHit {
                        target_id,
                        hp,
                        attacker_id,
                    },
                );
            }
            AttackOutcome::Killed => {
                self.fanout.send_to_members(
                    &members,
                    &ServerEvent::PlayerHit {
                        target_id,
                        hp: 0,
                        attacker_id,
                    },
                );

                let (attacker_name, attacker_balance) = {
                    let Some(attacker) = self.registry.session_mut(attacker_id) else {
                        return;
                    };
                    attacker.credit(self.arbiter.kill_reward);
                    (attacker.username.clone(), attacker.money)
                };
                self.persist_session_account(attacker_id);
                self.fanout.send_to_session(
                    attacker_id,
                    ServerEvent::UpdateMoney {
                        amount: attacker_balance,
                    },
                );

                self.fanout.send_to_members(
                    &members,
                    &ServerEvent::PlayerUpdate {
                        session: target_snapshot,
                    },
                );
                self.fanout
                    .send_to_session(target_id, ServerEvent::PlayerRespawned);
                self.system_chat(
                    &district,
                    format!("{} was slain by {}!", target_name, attacker_name),
                );
                info!("User {} slew {} in {}", attacker_name, target_name, district);
            }
        }
    }

    // ----- chat -----

    fn handle_chat(&mut self, conn: ConnId, text: &str) {
        let Some(id) = self.registry.session_id_for_conn(conn) else {
            return;
        };
        let text = sanitize_chat_text(text);
        if text.is_empty() {
            return;
        }
        let Some(session) = self.registry.session(id) else {
            return;
        };
        let district = session.district.clone();
        debug!("Chat from session {}: {}", id, escape_log(&text));

        let members = self.districts.members_of(&district);
        self.fanout.send_to_members(
            &members,
            &ServerEvent::ChatMessage {
                id,
                text,
                color: PLAYER_CHAT_COLOR.to_string(),
            },
        );
    }

    // ----- introspection -----

    pub fn session_count(&self) -> usize {
        self.registry.session_count()
    }

    pub fn district_of(&self, id: SessionId) -> Option<&str> {
        self.districts.location_of(id)
    }

    pub fn session_snapshot(&self, id: SessionId) -> Option<PlayerSnapshot> {
        self.registry.session(id).map(|s| s.snapshot())
    }

    pub fn store(&self) -> Arc<WorldStore> {
        Arc::clone(&self.store)
    }

    /// Waits until every queued persistence write has been applied.
    pub async fn flush_persistence(&self) {
        self.persist.flush().await;
    }

    // ----- helpers -----

    /// Server-originated chat line to every member of a district.
    fn system_chat(&self, district: &str, text: String) {
        let members = self.districts.members_of(district);
        self.fanout.send_to_members(
            &members,
            &ServerEvent::ChatMessage {
                id: SYSTEM_CHAT_ID,
                text,
                color: SYSTEM_CHAT_COLOR.to_string(),
            },
        );
    }

    /// Server-originated chat line to one connection, used for economy
    /// failure payloads.
    fn system_chat_to_conn(&self, conn: ConnId, text: String) {
        self.fanout.send_to_conn(
            conn,
            ServerEvent::ChatMessage {
                id: SYSTEM_CHAT_ID,
                text,
                color: SYSTEM_CHAT_COLOR.to_string(),
            },
        );
    }

    fn snapshots_of(&self, district: &str) -> Vec<PlayerSnapshot> {
        self.snapshots_for(&self.districts.members_of(district))
    }

    fn snapshots_for(&self, ids: &[SessionId]) -> Vec<PlayerSnapshot> {
        ids.iter()
            .filter_map(|id| self.registry.session(*id))
            .map(|session| session.snapshot())
            .collect()
    }

    fn plots_sorted(&self) -> Vec<PlotRecord> {
        let mut plots: Vec<PlotRecord> = self.plots.values().cloned().collect();
        plots.sort_by(|a, b| a.id.cmp(&b.id));
        plots
    }

    /// Reads the durable record, overlays the session's current fields, and
    /// enqueues the write. Load failures are logged and counted; the
    /// in-memory state stands either way.
    fn persist_session_account(&self, id: SessionId) {
        let Some(session) = self.registry.session(id) else {
            return;
        };
        match self.store.get_account(&session.username) {
            Ok(mut account) => {
                session.flush_into(&mut account);
                self.persist.save_account(account);
            }
            Err(e) => {
                warn!(
                    "Could not load account '{}' for persistence: {}",
                    session.username, e
                );
                crate::metrics::inc_persist_failures();
            }
        }
    }

    /// Like [`Self::persist_session_account`] but for a session already
    /// removed from the registry (the disconnect path).
    fn persist_departed_session(&self, session: &PlayerSession) {
        match self.store.get_account(&session.username) {
            Ok(mut account) => {
                session.flush_into(&mut account);
                self.persist.save_account(account);
            }
            Err(e) => {
                warn!(
                    "Could not load account '{}' for persistence: {}",
                    session.username, e
                );
                crate::metrics::inc_persist_failures();
            }
        }
    }
}

fn default_spawn(district: &str) -> Vec2 {
    district_geometry(district)
        .map(|geo| geo.spawn)
        .unwrap_or(INTERIOR_SPAWN)
}

/// Spawns the reader and writer tasks for one accepted connection. Events
/// are newline-delimited JSON in both directions.
fn spawn_connection(
    conn: ConnId,
    stream: TcpStream,
    mut outbound: mpsc::UnboundedReceiver<ServerEvent>,
    events: mpsc::UnboundedSender<ConnEvent>,
) {
    let (read_half, mut write_half) = stream.into_split();

    tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let mut line = match serde_json::to_string(&event) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to encode outbound event: {}", e);
                    continue;
                }
            };
            line.push('\n');
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<ClientEvent>(line) {
                        Ok(event) => {
                            if events.send(ConnEvent::Inbound(conn, event)).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            debug!(
                                "Connection {} sent malformed line ({}): {}",
                                conn,
                                e,
                                escape_log(line)
                            );
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!("Connection {} read error: {}", conn, e);
                    break;
                }
            }
        }
        let _ = events.send(ConnEvent::Closed(conn));
    });
}
