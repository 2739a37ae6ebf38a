//! Application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data (ledger database) | `~/Library/Application Support/fairflat/` | `~/.local/share/fairflat/` |
//! | Config | `~/Library/Application Support/fairflat/` | `~/.config/fairflat/` |
//!
//! # Environment Overrides
//!
//! - `FAIRFLAT_DATA_DIR` overrides [`data_dir`]
//! - `FAIRFLAT_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory; holds the ledger database.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("FAIRFLAT_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("fairflat"))
        .unwrap_or_else(|| PathBuf::from("/tmp/fairflat-data"))
}

/// Application config directory; holds `config.toml`.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("FAIRFLAT_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("fairflat"))
        .unwrap_or_else(|| PathBuf::from("/tmp/fairflat-config"))
}
