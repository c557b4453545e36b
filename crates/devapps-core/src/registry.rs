use crate::codec::Drawable;
use crate::error::Result;
use std::ops::BitOr;

/// Capability flags attached to a package by the registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PackageFlags(u32);

impl PackageFlags {
    pub const NONE: Self = Self(0);
    /// Part of the base system image.
    pub const SYSTEM: Self = Self(1 << 0);
    /// A system package replaced by a user-installed update.
    pub const UPDATED_SYSTEM_APP: Self = Self(1 << 7);

    const SYSTEM_APP_MASK: Self = Self(Self::SYSTEM.0 | Self::UPDATED_SYSTEM_APP.0);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for PackageFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Static metadata for one installed package, as the registry reports it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackageInfo {
    pub package_name: String,
    pub label: String,
    pub source_dir: String,
    pub data_dir: String,
    pub version_code: i64,
    pub version_name: String,
    pub flags: PackageFlags,
    /// Epoch milliseconds
    pub first_install_time: i64,
    /// Epoch milliseconds
    pub last_update_time: i64,
}

impl PackageInfo {
    /// System status survives an update installed over a system package.
    pub fn is_system_app(&self) -> bool {
        self.flags.intersects(PackageFlags::SYSTEM_APP_MASK)
    }
}

/// Which entry point a launch intent names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchKind {
    Primary,
    /// Large-screen / TV entry point.
    Alternate,
}

/// A resolved entry point that the registry knows how to start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchIntent {
    pub package_name: String,
    pub kind: LaunchKind,
    /// Explicit invocation target inside the package, if overridden.
    pub class_name: Option<String>,
}

impl LaunchIntent {
    pub fn new(package_name: impl Into<String>, kind: LaunchKind) -> Self {
        Self {
            package_name: package_name.into(),
            kind,
            class_name: None,
        }
    }

    /// Point the intent at an explicit target inside the package.
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }
}

/// Read-only view of the OS package registry.
///
/// The registry is owned and mutated by the OS; packages can disappear
/// between enumeration and a follow-up lookup, so every per-package call
/// may miss.
pub trait PackageRegistry: Send + Sync {
    /// Enumerate every installed package in the registry's native order.
    fn installed_packages(&self) -> Vec<PackageInfo>;

    /// Look up one package by exact identifier.
    fn package_info(&self, package_name: &str) -> Result<PackageInfo>;

    /// Resolve the primary entry point.
    fn launch_intent(&self, package_name: &str) -> Option<LaunchIntent>;

    /// Resolve the large-screen entry point.
    fn alternate_launch_intent(&self, _package_name: &str) -> Option<LaunchIntent> {
        None
    }

    /// Whether this registry knows about alternate entry points at all.
    fn supports_alternate_launch(&self) -> bool {
        false
    }

    /// Load the application icon.
    fn application_icon(&self, package_name: &str) -> Result<Box<dyn Drawable>>;

    /// Load the application banner. `Ok(None)` when the package has none.
    fn application_banner(&self, _package_name: &str) -> Result<Option<Box<dyn Drawable>>> {
        Ok(None)
    }

    /// Whether banners exist on this platform.
    fn supports_banners(&self) -> bool {
        false
    }

    /// Ask the OS to start the given entry point.
    fn start(&self, intent: &LaunchIntent) -> Result<()>;

    /// View used for one enumeration pass.
    ///
    /// Backends whose per-package calls rescan the OS return a view that
    /// answers from a single scan taken now. `None` means the registry is
    /// queried directly. A view must not outlive the pass it was taken for.
    fn snapshot(&self) -> Option<Box<dyn PackageRegistry + '_>> {
        None
    }
}
