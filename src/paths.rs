//! Application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/glance/` | `~/.local/share/glance/` |
//! | Config | `~/Library/Application Support/glance/` | `~/.config/glance/` |
//!
//! Overrides:
//! - `GLANCE_DATA_DIR` overrides [`data_dir`]
//! - `GLANCE_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Holds the shared widget state file. Resolves to `dirs::data_dir()/glance/`
/// unless `GLANCE_DATA_DIR` is set.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("GLANCE_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("glance"))
        .unwrap_or_else(|| PathBuf::from("/tmp/glance-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("GLANCE_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("glance"))
        .unwrap_or_else(|| PathBuf::from("/tmp/glance-config"))
}

/// Config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Shared widget state file (`data_dir()/widget_state.json`).
#[must_use]
pub fn widget_state_file() -> PathBuf {
    data_dir().join("widget_state.json")
}
