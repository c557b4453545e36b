//! Icon theme handling and indexing.

use crate::paths::{get_icon_theme_order, parse_icon_theme_index};
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const ICON_EXTENSIONS: [&str; 4] = ["png", "svg", "xpm", "webp"];
const RASTER_EXTENSIONS: [&str; 2] = ["png", "webp"];

/// Icon lookups across the themes and loose icon directories under a set of
/// base dirs. Nothing is cached: every index reflects the disk as it is now.
pub struct IconTheme {
    base_dirs: Vec<PathBuf>,
}

/// Icons found by one walk of the theme directories, keyed by lowercase stem.
pub struct IconIndex {
    icons: HashMap<String, PathBuf>,
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

fn is_raster(path: &Path) -> bool {
    extension(path).is_some_and(|e| RASTER_EXTENSIONS.contains(&e.as_str()))
}

impl IconTheme {
    pub fn new(base_dirs: Vec<PathBuf>) -> Self {
        Self { base_dirs }
    }

    /// Walk the icon directories and index what is there.
    pub fn index(&self) -> IconIndex {
        IconIndex {
            icons: self.build_index(),
        }
    }

    /// Map lowercase icon stems to files. Earlier directories win, except
    /// that a raster image replaces an earlier vector one.
    fn build_index(&self) -> HashMap<String, PathBuf> {
        let search_dirs = self.get_search_directories();
        debug!("Indexing icons under {} directories", search_dirs.len());

        let mut index: HashMap<String, PathBuf> = HashMap::new();
        let files = search_dirs
            .iter()
            .filter(|dir| dir.is_dir())
            .flat_map(|dir| WalkDir::new(dir).follow_links(true).max_depth(10))
            .filter_map(|entry| entry.ok())
            .filter(|entry| !entry.file_type().is_dir());

        for entry in files {
            let path = entry.path();
            let known = extension(path).is_some_and(|e| ICON_EXTENSIONS.contains(&e.as_str()));
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()).filter(|_| known) else {
                continue;
            };

            let replace = match index.get(&stem.to_lowercase()) {
                None => true,
                Some(existing) => !is_raster(existing) && is_raster(path),
            };
            if replace {
                index.insert(stem.to_lowercase(), path.to_path_buf());
            }
        }

        debug!("Indexed {} icons", index.len());
        index
    }

    /// One-off lookup. Absolute paths skip the index walk.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        resolve_absolute(name).unwrap_or_else(|| self.index().resolve(name))
    }

    /// Theme subdirectories in theme order, then the bare base dirs.
    fn get_search_directories(&self) -> Vec<PathBuf> {
        let mut result = Vec::new();

        for theme in get_icon_theme_order(&self.base_dirs) {
            let roots = self
                .base_dirs
                .iter()
                .map(|base| base.join(&theme))
                .filter(|root| root.is_dir());

            for root in roots {
                match parse_icon_theme_index(&root) {
                    Some(parsed) if !parsed.directories.is_empty() => {
                        result.extend(parsed.directories.iter().map(|d| root.join(d)));
                    }
                    // No usable index.theme: search the whole theme
                    _ => result.push(root),
                }
            }
        }

        result.extend(self.base_dirs.iter().cloned());
        result
    }
}

impl IconIndex {
    /// Resolve an icon name, or an absolute path, to an existing file.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if let Some(direct) = resolve_absolute(name) {
            return direct;
        }

        let key = name.to_lowercase();
        [key.clone(), key.replace(' ', "-"), key.replace('_', "-")]
            .iter()
            .find_map(|candidate| self.icons.get(candidate).cloned())
    }
}

/// Answers empty names and absolute paths directly; `None` for theme names.
fn resolve_absolute(name: &str) -> Option<Option<PathBuf>> {
    if name.is_empty() {
        return Some(None);
    }
    let direct = Path::new(name);
    direct
        .is_absolute()
        .then(|| direct.exists().then(|| direct.to_path_buf()))
}
