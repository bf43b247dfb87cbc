//! Service configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables. The file is taken from `PURRETYS_CONFIG` when set,
//! otherwise the first `purretys.toml` found in the usual locations.
//!
//! ```toml
//! environment = "development"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//! cors_origins = ["http://localhost:5173"]
//!
//! [auth]
//! secret_key = "..."
//! access_token_expire_minutes = 30
//!
//! [game]
//! metric_decay_rate = 0.1
//! decay_interval_secs = 60
//!
//! [repository]
//! type = "local"
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::db::RepositoryConfig;
use crate::models::task::TaskDifficulty;

/// Secret shipped in defaults. Refused in production.
pub const DEFAULT_SECRET_KEY: &str = "change-this-secret-key-in-production";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("SECRET_KEY must be changed from the default in production")]
    InsecureSecret,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" | "testing" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. A single `"*"` allows any origin.
    pub cors_origins: Vec<String>,
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:5173".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            body_limit_bytes: 1024 * 1024,
        }
    }
}

impl ServerSettings {
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub bcrypt_cost: u32,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            access_token_expire_minutes: 30,
            refresh_token_expire_days: 7,
            bcrypt_cost: 10,
        }
    }
}

/// Tunables of the pet economy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Metric points lost (or gained) per hour.
    pub metric_decay_rate: f64,
    pub decay_interval_secs: u64,
    pub initial_currency: i64,
    pub max_owners_per_pet: usize,
    pub invitation_expiry_days: i64,
    pub default_task_experience: u64,
    pub max_task_reward: i64,
    pub max_task_experience: u64,
    pub history_default_hours: i64,
    pub history_max_hours: i64,
    /// Attempts made by a mutation before a version conflict is surfaced.
    pub max_save_attempts: u32,
    pub easy_bonus: i64,
    pub medium_bonus: i64,
    pub hard_bonus: i64,
    pub expert_bonus: i64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            metric_decay_rate: 0.1,
            decay_interval_secs: 60,
            initial_currency: 100,
            max_owners_per_pet: 10,
            invitation_expiry_days: 7,
            default_task_experience: 5,
            max_task_reward: 1000,
            max_task_experience: 500,
            history_default_hours: 24,
            history_max_hours: 720,
            max_save_attempts: 5,
            easy_bonus: 5,
            medium_bonus: 10,
            hard_bonus: 20,
            expert_bonus: 40,
        }
    }
}

impl GameConfig {
    /// Currency awarded for a task when the creator does not set one.
    pub fn completion_bonus(&self, difficulty: TaskDifficulty) -> i64 {
        match difficulty {
            TaskDifficulty::Easy => self.easy_bonus,
            TaskDifficulty::Medium => self.medium_bonus,
            TaskDifficulty::Hard => self.hard_bonus,
            TaskDifficulty::Expert => self.expert_bonus,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeSettings {
    pub heartbeat_timeout_secs: i64,
    pub sse_keep_alive_secs: u64,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            heartbeat_timeout_secs: 60,
            sse_keep_alive_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub environment: Environment,
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub game: GameConfig,
    pub realtime: RealtimeSettings,
    pub repository: RepositoryConfig,
}

impl Settings {
    /// Load settings from a TOML file, without environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// First config file found in the standard locations.
    pub fn default_location() -> Option<PathBuf> {
        if let Ok(explicit) = std::env::var("PURRETYS_CONFIG") {
            return Some(PathBuf::from(explicit));
        }
        [
            "purretys.toml",
            "backend/purretys.toml",
            "../purretys.toml",
        ]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    }

    /// Defaults, then the config file if any, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = match Self::default_location() {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value,
                })
        }

        if let Some(v) = lookup("ENVIRONMENT") {
            self.environment = parse("ENVIRONMENT", v)?;
        }
        if let Some(v) = lookup("HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("PORT") {
            self.server.port = parse("PORT", v)?;
        }
        if let Some(v) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = parse_origins(&v);
        }
        if let Some(v) = lookup("SECRET_KEY") {
            self.auth.secret_key = v;
        }
        if let Some(v) = lookup("ACCESS_TOKEN_EXPIRE_MINUTES") {
            self.auth.access_token_expire_minutes = parse("ACCESS_TOKEN_EXPIRE_MINUTES", v)?;
        }
        if let Some(v) = lookup("REFRESH_TOKEN_EXPIRE_DAYS") {
            self.auth.refresh_token_expire_days = parse("REFRESH_TOKEN_EXPIRE_DAYS", v)?;
        }
        if let Some(v) = lookup("METRIC_DECAY_RATE") {
            self.game.metric_decay_rate = parse("METRIC_DECAY_RATE", v)?;
        }
        if let Some(v) = lookup("DECAY_INTERVAL_SECS") {
            self.game.decay_interval_secs = parse("DECAY_INTERVAL_SECS", v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment == Environment::Production && self.auth.secret_key == DEFAULT_SECRET_KEY
        {
            return Err(ConfigError::InsecureSecret);
        }
        if !(self.game.metric_decay_rate.is_finite() && self.game.metric_decay_rate >= 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "game.metric_decay_rate".to_string(),
                value: self.game.metric_decay_rate.to_string(),
            });
        }
        if self.game.decay_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "game.decay_interval_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.auth.access_token_expire_minutes <= 0 || self.auth.refresh_token_expire_days <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "auth token expiry".to_string(),
                value: format!(
                    "{}m/{}d",
                    self.auth.access_token_expire_minutes, self.auth.refresh_token_expire_days
                ),
            });
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

/// Comma separated origin list; `*` means any origin.
pub fn parse_origins(raw: &str) -> Vec<String> {
    if raw.trim() == "*" {
        return vec!["*".to_string()];
    }
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
