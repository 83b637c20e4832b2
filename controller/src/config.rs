//! Daemon configuration.
//!
//! Settings come from a TOML file; every field has a default so an empty (or
//! absent) file yields a working configuration. The live values sit behind a
//! [`SettingsStore`] shared with the controller, which re-reads the timeout
//! on every watchdog evaluation — replacing the store's contents reconfigures
//! a running daemon.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::RwLock;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_RPC_PORT: u16 = 8080;
const DEFAULT_SERIAL_DEVICE: &str = "/dev/ttyACM0";
const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Which backend drives the PA control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchBackend {
    /// Serial control line (the reference deployment).
    Serial,
    /// No controllable amplifier attached.
    Noop,
}

/// Settings consumed by the controller and daemon.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Seconds the amplifier may sit on without a refresh before the
    /// watchdog forces it off.
    pub timeout_secs: u64,
    /// TCP port the command server listens on.
    pub rpc_port: u16,
    /// How the PA control line is driven.
    pub switch_backend: SwitchBackend,
    /// Serial device of the PA control line.
    pub serial_device: String,
    /// Cadence of the daemon's built-in polling loop.
    pub poll_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            rpc_port: DEFAULT_RPC_PORT,
            switch_backend: SwitchBackend::Serial,
            serial_device: DEFAULT_SERIAL_DEVICE.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Idle timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Shared, reloadable settings.
#[derive(Debug, Default)]
pub struct SettingsStore(RwLock<Settings>);

impl SettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self(RwLock::new(settings))
    }

    /// Current idle timeout. Read per watchdog evaluation, never cached.
    pub fn timeout(&self) -> Duration {
        self.0.read().timeout()
    }

    /// Copy of the current settings.
    pub fn snapshot(&self) -> Settings {
        self.0.read().clone()
    }

    /// Replace the settings wholesale, e.g. after re-reading the file.
    pub fn replace(&self, settings: Settings) {
        *self.0.write() = settings;
    }
}
