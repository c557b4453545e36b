//! Core types for devapps-core

use serde::{Deserialize, Serialize};

/// Snapshot of one installed application, ready to cross the method channel.
///
/// Built fresh for every query and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRecord {
    pub app_name: String,
    pub package_name: String,
    pub apk_file_path: String,
    pub data_dir: String,
    pub version_code: i64,
    pub version_name: String,
    pub system_app: bool,
    /// Epoch milliseconds
    pub install_time: i64,
    /// Epoch milliseconds
    pub update_time: i64,

    // Image fields are omitted from the wire when absent, never sent as null
    /// PNG bytes, present only when requested and resolvable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_icon: Option<Vec<u8>>,
    /// PNG bytes, present only when requested, resolvable and supported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_banner: Option<Vec<u8>>,
}

/// Filter flags for one `getInstalledApps` query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryFilter {
    pub include_system_apps: bool,
    pub include_icons: bool,
    pub include_banners: bool,
    pub only_with_launch_intent: bool,
}
