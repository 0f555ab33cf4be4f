//! Configuration types for the widget sync engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Smallest tick period accepted for the refresh loop.
const MIN_TICK_PERIOD_MS: u64 = 100;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlanceConfig {
    /// Periodic refresh settings.
    pub timer: TimerConfig,
    /// Shared state store settings.
    pub store: StoreConfig,
    /// Refresh signal bus settings.
    pub signals: SignalConfig,
    /// Host bridge channel settings.
    pub bridge: BridgeConfig,
}

/// Periodic refresh loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Interval between `tick` refreshes while a timer runs, in milliseconds.
    pub tick_period_ms: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 1000,
        }
    }
}

impl TimerConfig {
    /// Tick period, clamped to a sane minimum.
    #[must_use]
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms.max(MIN_TICK_PERIOD_MS))
    }
}

/// Which key-value backend holds shared widget state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// JSON file shared between processes.
    #[default]
    File,
    /// In-process map; state is lost on exit.
    Memory,
}

/// Shared state store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend kind.
    pub backend: StoreBackend,
    /// State file path (None = `data_dir()/widget_state.json`).
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Resolved state file path.
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(crate::paths::widget_state_file)
    }
}

/// Refresh signal bus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Broadcast buffer size; slow renderers past this lag and skip signals.
    pub capacity: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Host bridge channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Pending command capacity.
    pub request_capacity: usize,
    /// Event broadcast capacity.
    pub event_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_capacity: 64,
            event_capacity: 128,
        }
    }
}

impl GlanceConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::GlanceError::Config(e.to_string()))
    }

    /// Load from the default path, or return defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default() -> crate::error::Result<Self> {
        let path = Self::default_config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::GlanceError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        crate::paths::config_file()
    }
}
