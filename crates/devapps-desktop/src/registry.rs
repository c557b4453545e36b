//! Package registry over XDG desktop entries.

use crate::desktop_entry::{DesktopApp, parse_desktop_file};
use crate::icons::{IconIndex, IconTheme};
use crate::launch::{exec_argv, spawn, try_exec_available};
use crate::paths::{
    AppDir, DirScope, app_data_dir, desktop_file_id, get_application_directories, get_icon_base_directories,
};
use chrono::{DateTime, Utc};
use devapps_core::{
    AppsError, BitmapDrawable, Drawable, LaunchIntent, LaunchKind, PackageFlags, PackageInfo, PackageRegistry,
    Result,
};
use log::{debug, info};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::SystemTime;

/// A desktop entry plus the flags derived from where it was found.
#[derive(Clone, Debug)]
struct InstalledEntry {
    app: DesktopApp,
    flags: PackageFlags,
}

/// Registry that treats every `Type=Application` desktop entry as an
/// installed package. The directories are re-scanned on every query.
pub struct DesktopRegistry {
    dirs: Vec<AppDir>,
    icon_theme: IconTheme,
}

impl DesktopRegistry {
    /// Registry over the standard XDG locations.
    pub fn from_environment(extra_dirs: &[PathBuf], include_bundles: bool) -> Self {
        Self::with_directories(
            get_application_directories(extra_dirs, include_bundles),
            get_icon_base_directories(),
        )
    }

    /// Registry over explicit application roots (precedence order) and icon
    /// base directories.
    pub fn with_directories(dirs: Vec<AppDir>, icon_dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            icon_theme: IconTheme::new(icon_dirs),
        }
    }

    fn scan(&self) -> Vec<InstalledEntry> {
        let mut entries: Vec<InstalledEntry> = Vec::new();
        // id -> (scope of winning root, index into entries if visible)
        let mut seen: HashMap<String, (DirScope, Option<usize>)> = HashMap::new();

        for dir in &self.dirs {
            if !dir.path.exists() {
                continue;
            }

            let walker = walkdir::WalkDir::new(&dir.path)
                .follow_links(true)
                .max_depth(3)
                .sort_by_file_name();

            for entry in walker.into_iter().filter_map(|e| e.ok()) {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("desktop") {
                    continue;
                }
                let Some(id) = desktop_file_id(&dir.path, path) else {
                    continue;
                };

                if let Some((winner_scope, index)) = seen.get(&id) {
                    // A user entry over a system one is an updated system app
                    if *winner_scope == DirScope::User && dir.scope == DirScope::System {
                        if let Some(i) = index {
                            let flags = entries[*i].flags;
                            entries[*i].flags = flags | PackageFlags::UPDATED_SYSTEM_APP;
                        }
                    }
                    continue;
                }

                let Some(app) = parse_desktop_file(path, id.clone()) else {
                    // Unusable, but it still claims the id
                    seen.insert(id, (dir.scope, None));
                    continue;
                };

                // Hidden means deleted, but it still shadows lower roots
                if app.hidden {
                    seen.insert(id, (dir.scope, None));
                    continue;
                }

                let flags = match dir.scope {
                    DirScope::System => PackageFlags::SYSTEM,
                    DirScope::User | DirScope::Bundle => PackageFlags::NONE,
                };
                seen.insert(id, (dir.scope, Some(entries.len())));
                entries.push(InstalledEntry { app, flags });
            }
        }

        debug!("Scanned {} desktop entries", entries.len());
        entries
    }

    fn find(&self, package_name: &str) -> Option<InstalledEntry> {
        self.scan().into_iter().find(|e| e.app.id == package_name)
    }
}

fn is_launchable(app: &DesktopApp) -> bool {
    if app.exec.is_none() || app.no_display {
        return false;
    }
    app.try_exec.as_deref().is_none_or(try_exec_available)
}

fn launch_intent_for(entry: &InstalledEntry) -> Option<LaunchIntent> {
    is_launchable(&entry.app).then(|| LaunchIntent::new(entry.app.id.as_str(), LaunchKind::Primary))
}

fn load_icon(
    package_name: &str,
    entry: Option<&InstalledEntry>,
    resolve: impl FnOnce(&str) -> Option<PathBuf>,
) -> Result<Box<dyn Drawable>> {
    let entry = entry.ok_or_else(|| AppsError::NotFound(package_name.to_string()))?;
    let icon_name = entry
        .app
        .icon_name
        .as_deref()
        .ok_or_else(|| AppsError::NotFound(format!("{package_name} declares no icon")))?;
    let path = resolve(icon_name).ok_or_else(|| AppsError::NotFound(format!("icon {icon_name}")))?;

    let image = image::open(&path)?;
    Ok(Box::new(BitmapDrawable::from(image)))
}

fn epoch_millis(time: std::io::Result<SystemTime>) -> i64 {
    time.map(|t| DateTime::<Utc>::from(t).timestamp_millis())
        .unwrap_or(0)
}

/// Numeric build number from a dotted version: `1.2.3` -> 1_002_003.
fn version_code(version_name: &str) -> i64 {
    let mut code = 0i64;
    let mut parts = 0u32;

    for part in version_name.split(['.', '-', '+']).take(3) {
        match part.parse::<i64>() {
            Ok(n) => {
                code = code * 1000 + n.clamp(0, 999);
                parts += 1;
            }
            Err(_) => break,
        }
    }

    if parts == 0 {
        return 0;
    }
    code * 1000i64.pow(3 - parts)
}

fn package_info(entry: &InstalledEntry) -> PackageInfo {
    let app = &entry.app;
    let metadata = fs::metadata(&app.desktop_file_path).ok();
    let modified = metadata
        .as_ref()
        .map(|m| epoch_millis(m.modified()))
        .unwrap_or(0);
    let created = metadata
        .as_ref()
        .map(|m| epoch_millis(m.created()))
        .filter(|t| *t > 0)
        .unwrap_or(modified);
    let version_name = app.version.clone().unwrap_or_default();

    PackageInfo {
        package_name: app.id.clone(),
        label: app.name.clone(),
        source_dir: app.desktop_file_path.to_string_lossy().into_owned(),
        data_dir: app_data_dir(&app.id).to_string_lossy().into_owned(),
        version_code: version_code(&version_name),
        version_name,
        flags: entry.flags,
        first_install_time: created,
        last_update_time: modified,
    }
}

impl PackageRegistry for DesktopRegistry {
    fn installed_packages(&self) -> Vec<PackageInfo> {
        self.scan().iter().map(package_info).collect()
    }

    fn package_info(&self, package_name: &str) -> Result<PackageInfo> {
        self.find(package_name)
            .map(|entry| package_info(&entry))
            .ok_or_else(|| AppsError::NotFound(package_name.to_string()))
    }

    fn launch_intent(&self, package_name: &str) -> Option<LaunchIntent> {
        self.find(package_name).as_ref().and_then(launch_intent_for)
    }

    fn application_icon(&self, package_name: &str) -> Result<Box<dyn Drawable>> {
        load_icon(package_name, self.find(package_name).as_ref(), |icon| {
            self.icon_theme.resolve(icon)
        })
    }

    fn start(&self, intent: &LaunchIntent) -> Result<()> {
        let entry = self
            .find(&intent.package_name)
            .ok_or_else(|| AppsError::NotFound(intent.package_name.clone()))?;
        let app = &entry.app;

        let exec = match &intent.class_name {
            Some(action_id) => app
                .action(action_id)
                .and_then(|action| action.exec.as_deref())
                .ok_or_else(|| AppsError::Launch(format!("{} has no action {}", app.id, action_id)))?,
            None => app
                .exec
                .as_deref()
                .ok_or_else(|| AppsError::Launch(format!("{} has no Exec line", app.id)))?,
        };

        let argv = exec_argv(exec, app);
        info!("Launching {}: {:?}", app.id, argv);
        spawn(&argv, app.terminal)?;
        Ok(())
    }

    fn snapshot(&self) -> Option<Box<dyn PackageRegistry + '_>> {
        Some(Box::new(DesktopSnapshot::new(self)))
    }
}

/// One scan of the entry roots serving every per-package call of a listing.
/// The icon index is walked on the first icon request, at most once.
struct DesktopSnapshot<'a> {
    registry: &'a DesktopRegistry,
    entries: Vec<InstalledEntry>,
    by_id: HashMap<String, usize>,
    icons: OnceLock<IconIndex>,
}

impl<'a> DesktopSnapshot<'a> {
    fn new(registry: &'a DesktopRegistry) -> Self {
        let entries = registry.scan();
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.app.id.clone(), i))
            .collect();
        Self {
            registry,
            entries,
            by_id,
            icons: OnceLock::new(),
        }
    }

    fn get(&self, package_name: &str) -> Option<&InstalledEntry> {
        self.by_id.get(package_name).map(|&i| &self.entries[i])
    }
}

impl PackageRegistry for DesktopSnapshot<'_> {
    fn installed_packages(&self) -> Vec<PackageInfo> {
        self.entries.iter().map(package_info).collect()
    }

    fn package_info(&self, package_name: &str) -> Result<PackageInfo> {
        self.get(package_name)
            .map(package_info)
            .ok_or_else(|| AppsError::NotFound(package_name.to_string()))
    }

    fn launch_intent(&self, package_name: &str) -> Option<LaunchIntent> {
        self.get(package_name).and_then(launch_intent_for)
    }

    fn application_icon(&self, package_name: &str) -> Result<Box<dyn Drawable>> {
        load_icon(package_name, self.get(package_name), |icon| {
            self.icons
                .get_or_init(|| self.registry.icon_theme.index())
                .resolve(icon)
        })
    }

    fn start(&self, intent: &LaunchIntent) -> Result<()> {
        self.registry.start(intent)
    }
}
