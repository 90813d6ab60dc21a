use crate::error::{Result, ShowError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ShowConfig / ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowConfig {
    #[serde(default = "default_show_name")]
    pub name: String,
}

fn default_show_name() -> String {
    "show".to_string()
}

impl Default for ShowConfig {
    fn default() -> Self {
        Self {
            name: default_show_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    4150
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Timing of the push channel and its polling fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Fixed delay between client reconnect attempts. Attempts are unbounded.
    #[serde(default = "default_reconnect")]
    pub reconnect_interval_secs: u64,
    /// Poll interval while a client has no live connection.
    #[serde(default = "default_poll")]
    pub poll_interval_secs: u64,
    /// Per-session outbound queue depth. A full queue marks the session stale.
    #[serde(default = "default_session_buffer")]
    pub session_buffer: usize,
    #[serde(default = "default_prune")]
    pub prune_interval_secs: u64,
    /// How often the server checks the store for writes made by other processes.
    #[serde(default = "default_watch")]
    pub watch_interval_ms: u64,
}

fn default_reconnect() -> u64 {
    3
}

fn default_poll() -> u64 {
    5
}

fn default_session_buffer() -> usize {
    64
}

fn default_prune() -> u64 {
    30
}

fn default_watch() -> u64 {
    800
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconnect_interval_secs: default_reconnect(),
            poll_interval_secs: default_poll(),
            session_buffer: default_session_buffer(),
            prune_interval_secs: default_prune(),
            watch_interval_ms: default_watch(),
        }
    }
}

/// Floor for the store watcher period. Timers never run with a zero period,
/// whatever the file says.
const MIN_WATCH_INTERVAL_MS: u64 = 10;

impl SyncConfig {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs.max(1))
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms.max(MIN_WATCH_INTERVAL_MS))
    }
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Bound on a single store operation. Exceeding it fails the command.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub show: ShowConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self::new(default_show_name())
    }
}

impl Config {
    pub fn new(show_name: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            show: ShowConfig {
                name: show_name.into(),
            },
            server: ServerConfig::default(),
            sync: SyncConfig::default(),
            store: StoreConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(ShowError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Like [`Config::load`], but an uninitialized root yields the defaults.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(ShowError::NotInitialized) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.sync.reconnect_interval_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "sync.reconnect_interval_secs is 0; clients would reconnect in a tight loop"
                    .to_string(),
            });
        }
        if self.sync.poll_interval_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "sync.poll_interval_secs must be at least 1".to_string(),
            });
        }
        if self.sync.session_buffer == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "sync.session_buffer must be at least 1".to_string(),
            });
        }
        if self.sync.prune_interval_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "sync.prune_interval_secs must be at least 1".to_string(),
            });
        }
        if self.sync.watch_interval_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "sync.watch_interval_ms must be at least 1".to_string(),
            });
        } else if self.sync.watch_interval_ms < 100 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "sync.watch_interval_ms={} polls the store very often",
                    self.sync.watch_interval_ms
                ),
            });
        }
        if self.store.timeout_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "store.timeout_ms is 0; every command would time out".to_string(),
            });
        } else if self.store.timeout_ms < 500 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "store.timeout_ms={} is short for disk-backed storage",
                    self.store.timeout_ms
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
