//! devapps-core: asynchronous installed-app query engine.
//!
//! Features:
//! - Registry abstraction over the OS package database
//! - PNG encoding of icons and banners
//! - Filtered listing on a single background worker, results handed back
//!   on the caller's delivery context
//! - Method-channel router (`getInstalledApps`, `getApp`, `isAppInstalled`, `openApp`)

pub mod codec;
pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod mapper;
pub mod query;
pub mod registry;
pub mod router;
pub mod types;

#[cfg(test)]
mod testing;

pub use codec::{BitmapDrawable, Drawable};
pub use delivery::{DeliveryContext, DeliveryHandle, DeliveryPump, delivery_channel};
pub use dispatcher::{Dispatcher, DispatcherState, Executor, Job, WorkerThread};
pub use error::{AppsError, Result};
pub use query::QueryEngine;
pub use registry::{LaunchIntent, LaunchKind, PackageFlags, PackageInfo, PackageRegistry};
pub use router::{Method, MethodCall, MethodResponse, Router};
pub use types::{AppRecord, QueryFilter};
