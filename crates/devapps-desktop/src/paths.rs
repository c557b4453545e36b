//! Path helpers for XDG directories and icon theme indexes.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

/// Which kind of installation a desktop entry root holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirScope {
    /// Per-user entries; they shadow everything below them.
    User,
    /// Entries shipped with the base system.
    System,
    /// Flatpak / Snap exports.
    Bundle,
}

/// One root directory scanned for `.desktop` files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppDir {
    pub path: PathBuf,
    pub scope: DirScope,
}

impl AppDir {
    pub fn new(path: impl Into<PathBuf>, scope: DirScope) -> Self {
        Self {
            path: path.into(),
            scope,
        }
    }
}

fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_default()
}

fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home().join(".local/share"))
}

fn xdg_data_dirs() -> Vec<PathBuf> {
    std::env::var("XDG_DATA_DIRS")
        .unwrap_or_else(|_| "/usr/local/share:/usr/share".to_string())
        .split(':')
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Icon roots searched for themes and loose images, user first.
pub fn get_icon_base_directories() -> Vec<PathBuf> {
    let home = home();
    let data_dirs = xdg_data_dirs();

    let user = [xdg_data_home().join("icons"), home.join(".icons")];
    let system = data_dirs
        .iter()
        .flat_map(|dir| [dir.join("icons"), dir.join("pixmaps")]);
    let bundles = [
        PathBuf::from("/var/lib/flatpak/exports/share/icons"),
        home.join(".local/share/flatpak/exports/share/icons"),
        PathBuf::from("/var/lib/snapd/desktop/icons"),
    ];

    let mut dirs: Vec<PathBuf> = user.into_iter().chain(system).collect();
    let pixmaps = PathBuf::from("/usr/share/pixmaps");
    if !dirs.contains(&pixmaps) {
        dirs.push(pixmaps);
    }
    dirs.extend(bundles);
    dirs
}

/// Get application directories in precedence order (first match wins).
pub fn get_application_directories(extra: &[PathBuf], include_bundles: bool) -> Vec<AppDir> {
    let mut dirs = vec![AppDir::new(xdg_data_home().join("applications"), DirScope::User)];

    for path in extra {
        dirs.push(AppDir::new(path.clone(), DirScope::User));
    }

    for data_dir in xdg_data_dirs() {
        dirs.push(AppDir::new(data_dir.join("applications"), DirScope::System));
    }

    if include_bundles {
        dirs.push(AppDir::new(
            home().join(".local/share/flatpak/exports/share/applications"),
            DirScope::Bundle,
        ));
        dirs.push(AppDir::new("/var/lib/flatpak/exports/share/applications", DirScope::Bundle));
        dirs.push(AppDir::new("/var/lib/snapd/desktop/applications", DirScope::Bundle));
    }

    dirs
}

/// Per-app private storage directory.
pub fn app_data_dir(package_name: &str) -> PathBuf {
    dirs::data_dir().unwrap_or_else(xdg_data_home).join(package_name)
}

/// Desktop file ID for `path` below `root`: subdirectories joined with
/// `-`, `.desktop` suffix removed (`kde/konsole.desktop` -> `kde-konsole`).
pub fn desktop_file_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .iter()
        .map(|part| part.to_string_lossy().into_owned())
        .collect();
    let joined = parts.join("-");
    let id = joined.strip_suffix(".desktop")?;
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Parsed index.theme content.
pub struct ParsedIconTheme {
    pub directories: Vec<String>,
    pub inherits: Vec<String>,
}

/// Read `Directories` and `Inherits` from `<theme_root>/index.theme`.
pub fn parse_icon_theme_index(theme_root: &Path) -> Option<ParsedIconTheme> {
    let content = fs::read_to_string(theme_root.join("index.theme")).ok()?;
    let mut parsed = ParsedIconTheme {
        directories: Vec::new(),
        inherits: Vec::new(),
    };
    let mut in_header = false;

    for line in content.lines().map(str::trim) {
        if line.starts_with('[') {
            in_header = line.eq_ignore_ascii_case("[Icon Theme]");
            continue;
        }
        let Some((key, value)) = line.split_once('=').filter(|_| in_header) else {
            continue;
        };
        let target = match key.trim() {
            "Directories" => &mut parsed.directories,
            "Inherits" => &mut parsed.inherits,
            _ => continue,
        };
        *target = value
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect();
    }

    Some(parsed)
}

/// Themes to search in order: `$GTK_THEME`, Adwaita, hicolor, plus
/// everything they inherit from.
pub fn get_icon_theme_order(base_dirs: &[PathBuf]) -> Vec<String> {
    let start = std::env::var("GTK_THEME")
        .ok()
        .into_iter()
        .chain(["Adwaita".to_string(), "hicolor".to_string()])
        .collect();

    resolve_theme_inheritance(start, base_dirs)
}

/// Breadth-first walk over `Inherits`. The first base dir holding a theme
/// decides its parents.
fn resolve_theme_inheritance(start: Vec<String>, base_dirs: &[PathBuf]) -> Vec<String> {
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut pending = VecDeque::from(start);

    while let Some(theme) = pending.pop_front() {
        if !seen.insert(theme.clone()) {
            continue;
        }

        let parents = base_dirs
            .iter()
            .find_map(|base| parse_icon_theme_index(&base.join(&theme)))
            .map(|parsed| parsed.inherits)
            .unwrap_or_default();
        pending.extend(parents.into_iter().filter(|p| !seen.contains(p)));

        order.push(theme);
    }

    order
}
