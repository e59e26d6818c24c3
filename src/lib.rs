//! # Plaza - Authoritative World Server
//!
//! Plaza is the server core for a small 2D multiplayer town: four fixed
//! districts (plaza, beach, housing, arena) plus per-plot house interiors,
//! with movement, an economy, and arena combat all arbitrated server-side.
//! Clients speak newline-delimited JSON over TCP and are never trusted with
//! an outcome: every purchase, quiz grade, and hit is recomputed here.
//!
//! ## Features
//!
//! - **Single-Worker Core**: All world state is owned by one event worker, so
//!   check-then-mutate sequences (purchases, attacks) never interleave.
//! - **District Routing**: Broadcast groups per district, including dynamic
//!   `house_<plot>` interiors, with atomic membership transfer.
//! - **Server-Side Movement**: Circle-vs-rect obstacle resolution with
//!   axis-separated sliding and seamless boundary crossing between districts.
//! - **Economy**: Plot ownership, furniture, a weapon catalog, and a quiz
//!   reward loop, all double-checked against server state.
//! - **Arena Combat**: Equipped-weapon damage and range, kill rewards, and
//!   instant respawn at full health.
//! - **Security**: Argon2id password hashing and input sanitization.
//! - **Durable World**: Embedded sled store with an asynchronous write-behind
//!   queue; broadcasts never wait on disk.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plaza::config::Config;
//! use plaza::server::WorldServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let server = WorldServer::new(config)?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`server`] - Accept loop, connection tasks, and the event worker
//! - [`world`] - Sessions, districts, geometry, arbitration, and persistence
//! - [`config`] - Configuration management and validation
//! - [`validation`] - Input validation and sanitization utilities
//! - [`metrics`] - Process-wide counters
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Connections    │ ← One reader + writer task per TCP client
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  World Server   │ ← Single-threaded event worker, owns all state
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  World Store    │ ← sled trees behind a write-behind queue
//! └─────────────────┘
//! ```

pub mod config;
pub mod logutil;
pub mod metrics;
pub mod server;
pub mod validation;
pub mod world;
