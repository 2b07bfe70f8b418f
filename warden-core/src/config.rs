//! Client configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logs::LogLoopOptions;
use crate::pool::PoolOptions;

/// Top-level configuration for a warden client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RconConfig {
    /// Target server.
    pub server: ServerConfig,
    /// Pool bounds.
    pub pool: PoolConfig,
    /// Log-loop tuning.
    pub logs: LogConfig,
}

/// Target server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// RCon host.
    pub host: String,
    /// RCon port.
    pub port: u16,
    /// RCon password.
    pub password: String,
}

/// Pool bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum sockets open at once.
    pub max_open: usize,
    /// Maximum warm sockets kept for reuse.
    pub max_idle: usize,
}

/// Log-loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// History window of the first fetch, in minutes.
    pub initial_minutes: u64,
    /// Pause between fetches, in seconds.
    pub poll_interval_secs: u64,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for RconConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            pool: PoolConfig::default(),
            logs: LogConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 27020,
            password: String::new(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_open: 10,
            max_idle: 10,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            initial_minutes: 60,
            poll_interval_secs: 5,
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl RconConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_open: self.pool.max_open,
            max_idle: self.pool.max_idle,
        }
    }

    pub fn log_loop_options(&self) -> LogLoopOptions {
        LogLoopOptions {
            initial_window: Duration::from_secs(self.logs.initial_minutes * 60),
            poll_interval: Duration::from_secs(self.logs.poll_interval_secs),
            ..LogLoopOptions::default()
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
