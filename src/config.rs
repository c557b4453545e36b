//! Host configuration.
//!
//! Loaded from `$DEVICE_APPS_CONFIG`, else `~/.config/device-apps/config.json`.
//! A missing file means defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_ENV: &str = "DEVICE_APPS_CONFIG";
const CONFIG_DIR: &str = "device-apps";
const CONFIG_FILE: &str = "config.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// env_logger filter, overridden by RUST_LOG
    pub log_level: String,
    /// Extra desktop-entry roots, scanned as user scope
    pub extra_application_dirs: Vec<PathBuf>,
    /// Scan flatpak and snap exports
    pub include_bundles: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            extra_application_dirs: Vec::new(),
            include_bundles: true,
        }
    }
}

impl HostConfig {
    /// Load from the default location.
    pub fn load() -> Result<Self, serde_json::Error> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`. An absent file yields the defaults, a malformed one
    /// an error.
    pub fn load_from(path: &Path) -> Result<Self, serde_json::Error> {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content),
            Err(_) => Ok(Self::default()),
        }
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}
