//! Query engine over the package registry.

use crate::mapper::map_package;
use crate::registry::{LaunchIntent, PackageInfo, PackageRegistry};
use crate::types::{AppRecord, QueryFilter};
use log::{debug, info, warn};
use std::sync::Arc;

/// Runs inventory queries against a shared registry.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct QueryEngine {
    registry: Arc<dyn PackageRegistry>,
}

impl QueryEngine {
    pub fn new(registry: Arc<dyn PackageRegistry>) -> Self {
        Self { registry }
    }

    /// List every installed package accepted by `filter`, in registry order.
    ///
    /// The whole pass, including launch and icon lookups, runs against one
    /// registry snapshot when the backend offers one.
    pub fn list(&self, filter: QueryFilter) -> Vec<AppRecord> {
        let snapshot = self.registry.snapshot();
        let registry: &dyn PackageRegistry = match snapshot.as_deref() {
            Some(view) => view,
            None => self.registry.as_ref(),
        };

        let packages = registry.installed_packages();
        let mut apps = Vec::with_capacity(packages.len());

        for package in &packages {
            if !accepts(registry, package, &filter) {
                continue;
            }
            apps.push(map_package(
                registry,
                package,
                filter.include_icons,
                filter.include_banners,
            ));
        }

        info!("Listed {} of {} installed packages", apps.len(), packages.len());
        apps
    }

    /// Fetch one package by exact identifier; `None` when it is not installed.
    pub fn lookup(&self, package_name: &str, include_icon: bool, include_banner: bool) -> Option<AppRecord> {
        match self.registry.package_info(package_name) {
            Ok(package) => Some(map_package(self.registry.as_ref(), &package, include_icon, include_banner)),
            Err(e) => {
                debug!("Lookup of {} missed: {}", package_name, e);
                None
            }
        }
    }

    /// Whether the registry holds any record for `package_name`.
    pub fn exists(&self, package_name: &str) -> bool {
        self.registry.package_info(package_name).is_ok()
    }

    /// Start the package, optionally at an explicit `class_name` target.
    ///
    /// Returns `false` when no entry point resolves or the OS refuses to
    /// start it.
    pub fn launch(&self, package_name: &str, class_name: Option<&str>) -> bool {
        let Some(mut intent) = self.resolve_launch_intent(package_name) else {
            info!("No launch intent found for {}", package_name);
            return false;
        };

        if let Some(class_name) = class_name {
            intent = intent.with_class_name(class_name);
        }

        info!("Starting {} (class: {:?}, {:?})", package_name, class_name, intent.kind);
        match self.registry.start(&intent) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to start {}: {}", package_name, e);
                false
            }
        }
    }

    fn resolve_launch_intent(&self, package_name: &str) -> Option<LaunchIntent> {
        let alternate = if self.registry.supports_alternate_launch() {
            self.registry.alternate_launch_intent(package_name)
        } else {
            None
        };
        alternate.or_else(|| self.registry.launch_intent(package_name))
    }
}

fn accepts(registry: &dyn PackageRegistry, package: &PackageInfo, filter: &QueryFilter) -> bool {
    if !filter.include_system_apps && package.is_system_app() {
        return false;
    }
    if filter.only_with_launch_intent && !has_launch_intent(registry, &package.package_name) {
        return false;
    }
    true
}

fn has_launch_intent(registry: &dyn PackageRegistry, package_name: &str) -> bool {
    registry.launch_intent(package_name).is_some()
        || (registry.supports_alternate_launch() && registry.alternate_launch_intent(package_name).is_some())
}
