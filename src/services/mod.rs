//! Services backing the method channel.
//!
//! - `apps` - installed-app queries over the desktop-entry registry

pub mod apps;
