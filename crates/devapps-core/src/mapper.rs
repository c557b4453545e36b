//! Converts registry package records into portable `AppRecord`s.

use crate::codec;
use crate::registry::{PackageInfo, PackageRegistry};
use crate::types::AppRecord;
use log::debug;

/// Build the record for `info`, embedding icon/banner PNG bytes on request.
///
/// Image lookups race against the OS (a package may be uninstalled
/// mid-query), so any failure just leaves the field out.
pub fn map_package(
    registry: &dyn PackageRegistry,
    info: &PackageInfo,
    include_icon: bool,
    include_banner: bool,
) -> AppRecord {
    let app_icon = if include_icon {
        load_icon(registry, &info.package_name)
    } else {
        None
    };

    let app_banner = if include_banner && registry.supports_banners() {
        load_banner(registry, &info.package_name)
    } else {
        None
    };

    AppRecord {
        app_name: info.label.clone(),
        package_name: info.package_name.clone(),
        apk_file_path: info.source_dir.clone(),
        data_dir: info.data_dir.clone(),
        version_code: info.version_code,
        version_name: info.version_name.clone(),
        system_app: info.is_system_app(),
        install_time: info.first_install_time,
        update_time: info.last_update_time,
        app_icon,
        app_banner,
    }
}

fn load_icon(registry: &dyn PackageRegistry, package_name: &str) -> Option<Vec<u8>> {
    let drawable = match registry.application_icon(package_name) {
        Ok(d) => d,
        Err(e) => {
            debug!("No icon for {}: {}", package_name, e);
            return None;
        }
    };

    match codec::encode(drawable.as_ref()) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            debug!("Could not encode icon for {}: {}", package_name, e);
            None
        }
    }
}

fn load_banner(registry: &dyn PackageRegistry, package_name: &str) -> Option<Vec<u8>> {
    let drawable = match registry.application_banner(package_name) {
        Ok(Some(d)) => d,
        Ok(None) => return None,
        Err(e) => {
            debug!("No banner for {}: {}", package_name, e);
            return None;
        }
    };

    codec::encode(drawable.as_ref())
        .map_err(|e| debug!("Could not encode banner for {}: {}", package_name, e))
        .ok()
}
