use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::reconcile::DEFAULT_REPAIR_CONCURRENCY;
use crate::streak::Calendar;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HabitusConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub calendar: CalendarConfig,
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// The single reference calendar every day key is computed in.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CalendarConfig {
    /// Minutes east of UTC. Must be strictly within ±24h.
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReconcileConfig {
    pub repair_concurrency: usize,
    pub serialize_per_user: bool,
    pub leaderboard_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            host: "127.0.0.1".into(),
            port: 7411,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_habitus_dir()
            .join("habitus.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            repair_concurrency: DEFAULT_REPAIR_CONCURRENCY,
            serialize_per_user: true,
            leaderboard_size: 10,
        }
    }
}

/// Returns `~/.habitus/`, or `./.habitus/` when there is no home directory.
pub fn default_habitus_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".habitus")
}

/// Returns the default config file path: `~/.habitus/config.toml`
pub fn default_config_path() -> PathBuf {
    default_habitus_dir().join("config.toml")
}

impl HabitusConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            HabitusConfig::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides (HABITUS_DB, HABITUS_LOG_LEVEL,
    /// HABITUS_UTC_OFFSET_MINUTES).
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("HABITUS_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("HABITUS_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("HABITUS_UTC_OFFSET_MINUTES") {
            self.calendar.utc_offset_minutes = val
                .trim()
                .parse()
                .with_context(|| format!("HABITUS_UTC_OFFSET_MINUTES is not an integer: {val}"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.reference_calendar()?;
        anyhow::ensure!(
            matches!(self.server.transport.as_str(), "stdio" | "http"),
            "unknown transport: {}. Supported: stdio, http",
            self.server.transport
        );
        Ok(())
    }

    /// The reference calendar described by `[calendar]`.
    pub fn reference_calendar(&self) -> Result<Calendar> {
        Calendar::from_offset_minutes(self.calendar.utc_offset_minutes).with_context(|| {
            format!(
                "calendar.utc_offset_minutes out of range: {}",
                self.calendar.utc_offset_minutes
            )
        })
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
