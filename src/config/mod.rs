//! # Configuration
//!
//! TOML-backed configuration for the world server, organized into
//! sections:
//!
//! - [`ServerConfig`] - bind address and connection limits
//! - [`StorageConfig`] - data persistence settings
//! - [`GameConfig`] - world rule constants (economy, combat, movement)
//! - [`LoggingConfig`] - logging settings
//!
//! Every field has a default, so a partial file (or none at all, via
//! `plaza init`) produces a runnable server.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 4600
//! max_sessions = 256
//!
//! [storage]
//! data_dir = "./data"
//!
//! [game]
//! starting_money = 1000
//! quiz_reward = 150
//! kill_reward = 100
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// New connections beyond this are refused at accept time.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

/// World rule constants. These are read once at startup; changing them
/// mid-run requires a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_starting_money")]
    pub starting_money: i64,
    #[serde(default = "default_quiz_reward")]
    pub quiz_reward: i64,
    #[serde(default = "default_kill_reward")]
    pub kill_reward: i64,
    /// Damage dealt with an empty equipment slot.
    #[serde(default = "default_damage")]
    pub default_damage: i32,
    /// Attack reach with an empty equipment slot.
    #[serde(default = "default_range")]
    pub default_range: f32,
    #[serde(default = "default_player_radius")]
    pub player_radius: f32,
    /// Boundary-crossing suppression window after a district change.
    #[serde(default = "default_transfer_cooldown_ms")]
    pub transfer_cooldown_ms: u64,
    #[serde(default = "default_max_health")]
    pub max_health: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    4600
}
fn default_max_sessions() -> usize {
    256
}
fn default_data_dir() -> String {
    "./data".to_string()
}
fn default_starting_money() -> i64 {
    1000
}
fn default_quiz_reward() -> i64 {
    150
}
fn default_kill_reward() -> i64 {
    100
}
fn default_damage() -> i32 {
    10
}
fn default_range() -> f32 {
    48.0
}
fn default_player_radius() -> f32 {
    16.0
}
fn default_transfer_cooldown_ms() -> u64 {
    1200
}
fn default_max_health() -> i32 {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_money: default_starting_money(),
            quiz_reward: default_quiz_reward(),
            kill_reward: default_kill_reward(),
            default_damage: default_damage(),
            default_range: default_range(),
            player_radius: default_player_radius(),
            transfer_cooldown_ms: default_transfer_cooldown_ms(),
            max_health: default_max_health(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            game: GameConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow!("server.host must not be empty"));
        }
        if self.server.port == 0 {
            return Err(anyhow!("server.port must be non-zero"));
        }
        if self.server.max_sessions == 0 {
            return Err(anyhow!("server.max_sessions must be at least 1"));
        }
        if self.game.max_health <= 0 {
            return Err(anyhow!("game.max_health must be positive"));
        }
        if self.game.player_radius <= 0.0 {
            return Err(anyhow!("game.player_radius must be positive"));
        }
        if self.game.default_range <= 0.0 {
            return Err(anyhow!("game.default_range must be positive"));
        }
        Ok(())
    }
}
