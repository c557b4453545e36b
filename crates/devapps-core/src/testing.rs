//! Fakes shared by the unit tests: registry, worker and delivery context.

use crate::codec::{BitmapDrawable, Drawable};
use crate::delivery::DeliveryContext;
use crate::dispatcher::{Executor, Job};
use crate::error::{AppsError, Result};
use crate::registry::{LaunchIntent, LaunchKind, PackageFlags, PackageInfo, PackageRegistry};
use image::{Rgba, RgbaImage};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Clone, Debug)]
pub struct FakePackage {
    pub info: PackageInfo,
    pub launchable: bool,
    pub alternate_launchable: bool,
    pub icon: Option<(u32, u32)>,
    pub banner: Option<(u32, u32)>,
}

impl FakePackage {
    pub fn new(package_name: &str) -> Self {
        Self {
            info: PackageInfo {
                package_name: package_name.to_string(),
                label: format!("{package_name} label"),
                source_dir: format!("/data/app/{package_name}/base.apk"),
                data_dir: format!("/data/user/0/{package_name}"),
                version_code: 42,
                version_name: "4.2".to_string(),
                flags: PackageFlags::NONE,
                first_install_time: 1_600_000_000_000,
                last_update_time: 1_700_000_000_000,
            },
            launchable: false,
            alternate_launchable: false,
            icon: None,
            banner: None,
        }
    }

    pub fn system(mut self) -> Self {
        self.info.flags = self.info.flags | PackageFlags::SYSTEM;
        self
    }

    pub fn launchable(mut self) -> Self {
        self.launchable = true;
        self
    }

    pub fn alternate_launchable(mut self) -> Self {
        self.alternate_launchable = true;
        self
    }

    pub fn with_icon(mut self, width: u32, height: u32) -> Self {
        self.icon = Some((width, height));
        self
    }

    pub fn with_banner(mut self, width: u32, height: u32) -> Self {
        self.banner = Some((width, height));
        self
    }
}

/// Fake registry with a call counter and a record of started intents.
#[derive(Default)]
pub struct FakeRegistry {
    packages: Vec<FakePackage>,
    alternate_supported: bool,
    banners_supported: bool,
    pub fail_start: bool,
    /// Packages the snapshot view answers from, if snapshots are offered
    snapshot: Option<Vec<FakePackage>>,
    calls: AtomicUsize,
    started: Mutex<Vec<LaunchIntent>>,
}

impl FakeRegistry {
    pub fn new(packages: Vec<FakePackage>) -> Self {
        Self {
            packages,
            alternate_supported: true,
            banners_supported: true,
            ..Default::default()
        }
    }

    pub fn without_alternate_launch(mut self) -> Self {
        self.alternate_supported = false;
        self
    }

    pub fn without_banners(mut self) -> Self {
        self.banners_supported = false;
        self
    }

    /// Offer a snapshot view holding `packages` instead of the live set.
    pub fn with_snapshot(mut self, packages: Vec<FakePackage>) -> Self {
        self.snapshot = Some(packages);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> Vec<LaunchIntent> {
        self.started.lock().unwrap().clone()
    }

    fn find(&self, package_name: &str) -> Option<&FakePackage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.packages.iter().find(|p| p.info.package_name == package_name)
    }
}

fn solid(width: u32, height: u32) -> Box<dyn Drawable> {
    Box::new(BitmapDrawable::new(RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 255]))))
}

impl PackageRegistry for FakeRegistry {
    fn installed_packages(&self) -> Vec<PackageInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.packages.iter().map(|p| p.info.clone()).collect()
    }

    fn package_info(&self, package_name: &str) -> Result<PackageInfo> {
        self.find(package_name)
            .map(|p| p.info.clone())
            .ok_or_else(|| AppsError::NotFound(package_name.to_string()))
    }

    fn launch_intent(&self, package_name: &str) -> Option<LaunchIntent> {
        self.find(package_name)
            .filter(|p| p.launchable)
            .map(|_| LaunchIntent::new(package_name, LaunchKind::Primary))
    }

    fn alternate_launch_intent(&self, package_name: &str) -> Option<LaunchIntent> {
        self.find(package_name)
            .filter(|p| p.alternate_launchable)
            .map(|_| LaunchIntent::new(package_name, LaunchKind::Alternate))
    }

    fn supports_alternate_launch(&self) -> bool {
        self.alternate_supported
    }

    fn application_icon(&self, package_name: &str) -> Result<Box<dyn Drawable>> {
        let package = self
            .find(package_name)
            .ok_or_else(|| AppsError::NotFound(package_name.to_string()))?;
        let (width, height) = package.icon.ok_or_else(|| AppsError::NotFound(package_name.to_string()))?;
        Ok(solid(width, height))
    }

    fn application_banner(&self, package_name: &str) -> Result<Option<Box<dyn Drawable>>> {
        let package = self
            .find(package_name)
            .ok_or_else(|| AppsError::NotFound(package_name.to_string()))?;
        Ok(package.banner.map(|(width, height)| solid(width, height)))
    }

    fn supports_banners(&self) -> bool {
        self.banners_supported
    }

    fn start(&self, intent: &LaunchIntent) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(AppsError::Launch("activity not found".to_string()));
        }
        self.started.lock().unwrap().push(intent.clone());
        Ok(())
    }

    fn snapshot(&self) -> Option<Box<dyn PackageRegistry + '_>> {
        let packages = self.snapshot.clone()?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut view = FakeRegistry::new(packages);
        view.alternate_supported = self.alternate_supported;
        view.banners_supported = self.banners_supported;
        Some(Box::new(view))
    }
}

/// Worker that queues jobs until the test runs them.
#[derive(Default)]
pub struct ManualExecutor {
    queue: Mutex<VecDeque<Job>>,
    shut: AtomicBool,
}

impl ManualExecutor {
    pub fn run_next(&self) -> bool {
        let job = self.queue.lock().unwrap().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    pub fn run_all(&self) {
        while self.run_next() {}
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, job: Job) -> bool {
        if self.shut.load(Ordering::SeqCst) {
            return false;
        }
        self.queue.lock().unwrap().push_back(job);
        true
    }

    fn shutdown(&self) {
        self.shut.store(true, Ordering::SeqCst);
    }
}

/// Delivery context that records posted jobs until the test runs them.
pub struct RecordingDelivery {
    jobs: Mutex<Vec<Job>>,
    alive: AtomicBool,
    posts: AtomicUsize,
}

impl RecordingDelivery {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            alive: AtomicBool::new(true),
            posts: AtomicUsize::new(0),
        }
    }

    pub fn run_all(&self) {
        let jobs: Vec<Job> = self.jobs.lock().unwrap().drain(..).collect();
        for job in jobs {
            job();
        }
    }

    pub fn post_count(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }

    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

impl DeliveryContext for RecordingDelivery {
    fn post(&self, job: Job) -> bool {
        self.posts.fetch_add(1, Ordering::SeqCst);
        self.jobs.lock().unwrap().push(job);
        true
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}
