//! App inventory service.
//!
//! Wires the desktop-entry registry into the query engine and router.

use crate::config::HostConfig;
use devapps_core::{QueryEngine, Router};
use devapps_desktop::DesktopRegistry;
use log::info;
use std::sync::Arc;

/// Build the router for `config`. Nothing is scanned until the first query.
pub fn build_router(config: &HostConfig) -> Router {
    info!(
        "App registry: {} extra dirs, bundles {}",
        config.extra_application_dirs.len(),
        if config.include_bundles { "on" } else { "off" }
    );

    let registry = DesktopRegistry::from_environment(
        &config.extra_application_dirs,
        config.include_bundles,
    );
    Router::new(QueryEngine::new(Arc::new(registry)))
}
