//! devapps-desktop: package registry backed by Linux desktop entries.
//!
//! Provides:
//! - Desktop application discovery from .desktop files (user, system, flatpak, snap)
//! - Icon lookup with theme inheritance
//! - Launching entries and their desktop actions

mod desktop_entry;
mod icons;
mod launch;
mod paths;
mod registry;

pub use desktop_entry::{DesktopAction, DesktopApp};
pub use icons::{IconIndex, IconTheme};
pub use paths::{AppDir, DirScope};
pub use registry::DesktopRegistry;
