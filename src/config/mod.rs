//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Directory of bundled client assets served at `/`.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("./public")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            static_dir: default_static_dir(),
        }
    }
}

/// Pacing and lifetime knobs for rooms and battles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Delay between the first ready and the countdown starting.
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,

    /// Delay between broadcast resolution steps, for client animation.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,

    /// Idle time after which a room is evicted.
    #[serde(default = "default_room_ttl_secs")]
    pub room_ttl_secs: u64,

    /// How often the eviction sweep runs.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_start_delay_ms() -> u64 {
    3000
}

fn default_step_delay_ms() -> u64 {
    1000
}

fn default_room_ttl_secs() -> u64 {
    900
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: default_start_delay_ms(),
            step_delay_ms: default_step_delay_ms(),
            room_ttl_secs: default_room_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub game: GameConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.game.room_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "Room TTL must be greater than 0".to_string(),
            ));
        }

        if self.game.sweep_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "Sweep interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
