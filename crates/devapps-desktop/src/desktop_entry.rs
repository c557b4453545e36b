//! Desktop entry parsing.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A `[Desktop Action <id>]` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesktopAction {
    pub id: String,
    pub name: Option<String>,
    pub exec: Option<String>,
}

/// Parsed from .desktop files.
#[derive(Clone, Debug)]
pub struct DesktopApp {
    pub id: String,
    pub name: String,
    pub exec: Option<String>,
    pub try_exec: Option<String>,
    pub icon_name: Option<String>,
    pub version: Option<String>,
    pub no_display: bool,
    /// Entry is deleted for this user.
    pub hidden: bool,
    pub terminal: bool,
    pub actions: Vec<DesktopAction>,
    pub desktop_file_path: PathBuf,
}

impl DesktopApp {
    pub fn action(&self, id: &str) -> Option<&DesktopAction> {
        self.actions.iter().find(|a| a.id == id)
    }
}

/// Parse a .desktop file into a DesktopApp struct.
pub fn parse_desktop_file(path: &Path, id: String) -> Option<DesktopApp> {
    let content = fs::read_to_string(path).ok()?;
    parse_desktop_entry(&content, id, path)
}

/// Parse desktop entry text. Only `Type=Application` entries with a `Name`
/// are accepted.
pub fn parse_desktop_entry(content: &str, id: String, path: &Path) -> Option<DesktopApp> {
    let mut entries: HashMap<String, String> = HashMap::new();
    let mut actions: Vec<(String, HashMap<String, String>)> = Vec::new();
    let mut section = Section::Other;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            let header = &line[1..line.len() - 1];
            section = if header == "Desktop Entry" {
                Section::Entry
            } else if let Some(action_id) = header.strip_prefix("Desktop Action ") {
                actions.push((action_id.trim().to_string(), HashMap::new()));
                Section::Action
            } else {
                Section::Other
            };
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim().to_string(), value.trim().to_string());

        match section {
            Section::Entry => {
                entries.insert(key, value);
            }
            Section::Action => {
                if let Some((_, keys)) = actions.last_mut() {
                    keys.insert(key, value);
                }
            }
            Section::Other => {}
        }
    }

    if entries.get("Type").map(|s| s.as_str()) != Some("Application") {
        return None;
    }

    let name = entries.get("Name")?.clone();
    let flag = |key: &str| entries.get(key).map(|s| s == "true").unwrap_or(false);
    let non_empty = |key: &str| entries.get(key).filter(|s| !s.is_empty()).cloned();

    // Only actions listed in Actions= are active
    let listed: Vec<&str> = entries
        .get("Actions")
        .map(|s| s.split(';').filter(|a| !a.is_empty()).collect())
        .unwrap_or_default();

    let actions = actions
        .into_iter()
        .filter(|(action_id, _)| listed.contains(&action_id.as_str()))
        .map(|(action_id, keys)| DesktopAction {
            id: action_id,
            name: keys.get("Name").cloned(),
            exec: keys.get("Exec").filter(|s| !s.is_empty()).cloned(),
        })
        .collect();

    Some(DesktopApp {
        id,
        name,
        exec: non_empty("Exec"),
        try_exec: non_empty("TryExec"),
        icon_name: non_empty("Icon"),
        version: non_empty("X-AppVersion"),
        no_display: flag("NoDisplay"),
        hidden: flag("Hidden"),
        terminal: flag("Terminal"),
        actions,
        desktop_file_path: path.to_path_buf(),
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Entry,
    Action,
    Other,
}
