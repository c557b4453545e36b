//! Request router for the method channel.
//!
//! Parses a method name plus JSON arguments, validates them, runs the
//! matching engine operation and encodes the outcome for the transport.

use crate::delivery::DeliveryContext;
use crate::dispatcher::{Dispatcher, DispatcherState};
use crate::error::Result;
use crate::query::QueryEngine;
use crate::types::QueryFilter;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};

pub const ERROR_CODE: &str = "ERROR";
pub const NO_ACTIVITY_CODE: &str = "NO_ACTIVITY";
const EMPTY_PACKAGE_NAME: &str = "Empty or null package name";

/// One incoming method call.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub arguments: Map<String, Value>,
}

impl MethodCall {
    /// Non-object arguments are treated as "no arguments".
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// Boolean argument; missing or non-boolean values read as `false`.
    fn flag(&self, key: &str) -> bool {
        self.arguments.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// String argument; missing, null and empty values read as `None`.
    fn string(&self, key: &str) -> Option<&str> {
        self.arguments
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Outcome of a method call.
#[derive(Clone, Debug, PartialEq)]
pub enum MethodResponse {
    Success(Value),
    Error { code: String, message: String },
    NotImplemented,
}

impl MethodResponse {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        MethodResponse::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    fn encode<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => MethodResponse::Success(v),
            Err(e) => MethodResponse::error(ERROR_CODE, format!("Failed to encode result: {e}")),
        }
    }
}

/// Methods exposed on the channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    GetInstalledApps,
    GetApp,
    IsAppInstalled,
    OpenApp,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "getInstalledApps" => Some(Method::GetInstalledApps),
            "getApp" => Some(Method::GetApp),
            "isAppInstalled" => Some(Method::IsAppInstalled),
            "openApp" => Some(Method::OpenApp),
            _ => None,
        }
    }
}

/// Routes method calls to the query engine.
///
/// Calls are only served while a delivery context is attached; the
/// attachment owns the dispatcher, so detaching also stops it.
pub struct Router {
    engine: QueryEngine,
    dispatcher: Mutex<Option<Dispatcher>>,
}

impl Router {
    pub fn new(engine: QueryEngine) -> Self {
        Self {
            engine,
            dispatcher: Mutex::new(None),
        }
    }

    /// Bind a delivery context, starting a fresh worker for it.
    pub fn attach(&self, delivery: Arc<dyn DeliveryContext>) -> Result<()> {
        self.attach_dispatcher(Dispatcher::start(delivery)?);
        Ok(())
    }

    /// Bind an already built dispatcher. Any previous one is stopped.
    pub fn attach_dispatcher(&self, dispatcher: Dispatcher) {
        if let Ok(mut guard) = self.dispatcher.lock() {
            if let Some(previous) = guard.replace(dispatcher) {
                warn!("Attaching over a live dispatcher, stopping the old one");
                previous.stop();
            }
        }
    }

    /// Host view teardown: stop the dispatcher and unbind.
    pub fn detach(&self) {
        let previous = self.dispatcher.lock().ok().and_then(|mut guard| guard.take());
        match previous {
            Some(dispatcher) => {
                dispatcher.stop();
                info!("Router detached");
            }
            None => debug!("Detach without an attached delivery context"),
        }
    }

    /// State of the attached dispatcher, `None` when detached.
    pub fn dispatcher_state(&self) -> Option<DispatcherState> {
        self.dispatcher.lock().ok()?.as_ref().map(Dispatcher::state)
    }

    pub fn is_attached(&self) -> bool {
        self.dispatcher.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    /// Handle one call. `reply` is invoked exactly once on the delivery
    /// context, or never if the context is torn down first.
    pub fn handle<R>(&self, call: MethodCall, reply: R)
    where
        R: FnOnce(MethodResponse) + Send + 'static,
    {
        if !self.is_attached() {
            reply(no_activity(&call.method));
            return;
        }

        let Some(method) = Method::from_name(&call.method) else {
            debug!("Unknown method {}", call.method);
            reply(MethodResponse::NotImplemented);
            return;
        };

        match method {
            Method::GetInstalledApps => self.get_installed_apps(&call, reply),
            Method::GetApp => {
                let Some(package_name) = call.string("package_name") else {
                    reply(MethodResponse::error(ERROR_CODE, EMPTY_PACKAGE_NAME));
                    return;
                };
                let app = self.engine.lookup(
                    package_name,
                    call.flag("include_app_icon"),
                    call.flag("include_app_banner"),
                );
                reply(MethodResponse::encode(&app));
            }
            Method::IsAppInstalled => {
                let Some(package_name) = call.string("package_name") else {
                    reply(MethodResponse::error(ERROR_CODE, EMPTY_PACKAGE_NAME));
                    return;
                };
                reply(MethodResponse::Success(Value::Bool(self.engine.exists(package_name))));
            }
            Method::OpenApp => {
                let Some(package_name) = call.string("package_name") else {
                    reply(MethodResponse::error(ERROR_CODE, EMPTY_PACKAGE_NAME));
                    return;
                };
                let opened = self.engine.launch(package_name, call.string("class_name"));
                reply(MethodResponse::Success(Value::Bool(opened)));
            }
        }
    }

    fn get_installed_apps<R>(&self, call: &MethodCall, reply: R)
    where
        R: FnOnce(MethodResponse) + Send + 'static,
    {
        let filter = QueryFilter {
            include_system_apps: call.flag("system_apps"),
            include_icons: call.flag("include_app_icons"),
            include_banners: call.flag("include_app_banners"),
            only_with_launch_intent: call.flag("only_apps_with_launch_intent"),
        };
        debug!("getInstalledApps with {:?}", filter);

        // Check and submit under one lock: a detach lands before or after both
        {
            let guard = self.dispatcher.lock().ok();
            let live = guard
                .as_deref()
                .and_then(Option::as_ref)
                .filter(|dispatcher| dispatcher.state() != DispatcherState::Stopped);
            if let Some(dispatcher) = live {
                let engine = self.engine.clone();
                if !dispatcher.run(
                    move || engine.list(filter),
                    move |apps| reply(MethodResponse::encode(&apps)),
                ) {
                    debug!("getInstalledApps rejected by the worker");
                }
                return;
            }
        }

        debug!("getInstalledApps without a live dispatcher");
        reply(no_activity(&call.method));
    }
}

fn no_activity(method: &str) -> MethodResponse {
    MethodResponse::error(NO_ACTIVITY_CODE, format!("{method} requires a foreground activity."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePackage, FakeRegistry, ManualExecutor, RecordingDelivery};
    use crate::types::AppRecord;
    use crossbeam_channel::Receiver;
    use serde_json::json;

    struct Harness {
        router: Router,
        registry: Arc<FakeRegistry>,
        worker: Arc<ManualExecutor>,
        delivery: Arc<RecordingDelivery>,
    }

    impl Harness {
        fn new(registry: FakeRegistry) -> Self {
            let registry = Arc::new(registry);
            let router = Router::new(QueryEngine::new(registry.clone()));
            let worker = Arc::new(ManualExecutor::default());
            let delivery = Arc::new(RecordingDelivery::new());
            router.attach_dispatcher(Dispatcher::with_executor(worker.clone(), delivery.clone()));
            Self {
                router,
                registry,
                worker,
                delivery,
            }
        }

        fn call(&self, method: &str, arguments: Value) -> Receiver<MethodResponse> {
            let (tx, rx) = crossbeam_channel::unbounded();
            self.router.handle(MethodCall::new(method, arguments), move |response| {
                tx.send(response).unwrap();
            });
            rx
        }

        fn call_now(&self, method: &str, arguments: Value) -> MethodResponse {
            self.call(method, arguments).try_recv().unwrap()
        }

        fn pump(&self) {
            self.worker.run_all();
            self.delivery.run_all();
        }
    }

    fn scenario() -> FakeRegistry {
        FakeRegistry::new(vec![
            FakePackage::new("A").system().launchable(),
            FakePackage::new("B"),
            FakePackage::new("C").launchable().with_icon(16, 16),
        ])
    }

    fn records(response: MethodResponse) -> Vec<AppRecord> {
        match response {
            MethodResponse::Success(value) => serde_json::from_value(value).unwrap(),
            other => panic!("expected success, got {other:?}"),
        }
    }

    fn empty_package_error() -> MethodResponse {
        MethodResponse::error(ERROR_CODE, "Empty or null package name")
    }

    #[test]
    fn test_installed_apps_delivered_after_worker() {
        let harness = Harness::new(scenario());
        let rx = harness.call(
            "getInstalledApps",
            json!({"system_apps": false, "only_apps_with_launch_intent": true}),
        );

        harness.worker.run_all();
        assert!(rx.try_recv().is_err());

        harness.delivery.run_all();
        let apps = records(rx.try_recv().unwrap());
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].package_name, "C");
        assert!(apps[0].app_icon.is_none());
    }

    #[test]
    fn test_installed_apps_missing_flags_default_false() {
        let harness = Harness::new(scenario());
        let rx = harness.call("getInstalledApps", json!({"system_apps": "yes"}));
        harness.pump();

        let names: Vec<String> = records(rx.try_recv().unwrap())
            .into_iter()
            .map(|a| a.package_name)
            .collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_installed_apps_with_icons() {
        let harness = Harness::new(scenario());
        let rx = harness.call(
            "getInstalledApps",
            json!({"system_apps": true, "include_app_icons": true}),
        );
        harness.pump();

        let apps = records(rx.try_recv().unwrap());
        assert_eq!(apps.len(), 3);
        let c = apps.iter().find(|a| a.package_name == "C").unwrap();
        assert!(c.app_icon.as_ref().is_some_and(|b| !b.is_empty()));
        assert!(apps.iter().filter(|a| a.package_name != "C").all(|a| a.app_icon.is_none()));
    }

    #[test]
    fn test_get_app_empty_name_never_touches_registry() {
        let harness = Harness::new(scenario());

        assert_eq!(harness.call_now("getApp", json!({"package_name": ""})), empty_package_error());
        assert_eq!(harness.call_now("getApp", json!({"package_name": null})), empty_package_error());
        assert_eq!(harness.call_now("getApp", json!({})), empty_package_error());
        assert_eq!(harness.registry.call_count(), 0);
    }

    #[test]
    fn test_required_name_validated_for_every_method() {
        let harness = Harness::new(scenario());

        assert_eq!(harness.call_now("isAppInstalled", json!({})), empty_package_error());
        assert_eq!(
            harness.call_now("openApp", json!({"package_name": "", "class_name": "Main"})),
            empty_package_error()
        );
        assert_eq!(harness.registry.call_count(), 0);
    }

    #[test]
    fn test_get_app() {
        let harness = Harness::new(scenario());

        let response = harness.call_now("getApp", json!({"package_name": "C", "include_app_icon": true}));
        let MethodResponse::Success(value) = response else {
            panic!("expected success");
        };
        let app: AppRecord = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(app.package_name, "C");
        assert!(app.app_icon.is_some());
        assert!(value.get("app_banner").is_none());

        let plain = harness.call_now("getApp", json!({"package_name": "C"}));
        let MethodResponse::Success(value) = plain else {
            panic!("expected success");
        };
        assert!(value.get("app_icon").is_none());
    }

    #[test]
    fn test_get_unknown_app_is_null() {
        let harness = Harness::new(scenario());
        assert_eq!(
            harness.call_now("getApp", json!({"package_name": "missing"})),
            MethodResponse::Success(Value::Null)
        );
    }

    #[test]
    fn test_is_app_installed() {
        let harness = Harness::new(scenario());
        assert_eq!(
            harness.call_now("isAppInstalled", json!({"package_name": "A"})),
            MethodResponse::Success(json!(true))
        );
        assert_eq!(
            harness.call_now("isAppInstalled", json!({"package_name": "missing"})),
            MethodResponse::Success(json!(false))
        );
    }

    #[test]
    fn test_open_app() {
        let harness = Harness::new(scenario());

        assert_eq!(
            harness.call_now("openApp", json!({"package_name": "C", "class_name": "org.example.Main"})),
            MethodResponse::Success(json!(true))
        );
        assert_eq!(
            harness.call_now("openApp", json!({"package_name": "B"})),
            MethodResponse::Success(json!(false))
        );

        let started = harness.registry.started();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].class_name.as_deref(), Some("org.example.Main"));
    }

    #[test]
    fn test_unknown_method_not_implemented() {
        let harness = Harness::new(scenario());
        assert_eq!(harness.call_now("uninstallApp", json!({})), MethodResponse::NotImplemented);
    }

    #[test]
    fn test_detached_router_requires_activity() {
        let registry = Arc::new(scenario());
        let router = Router::new(QueryEngine::new(registry.clone()));

        for method in ["getInstalledApps", "getApp", "somethingElse"] {
            let (tx, rx) = crossbeam_channel::unbounded();
            router.handle(MethodCall::new(method, json!({"package_name": "A"})), move |r| {
                tx.send(r).unwrap();
            });
            assert_eq!(
                rx.try_recv().unwrap(),
                MethodResponse::error(NO_ACTIVITY_CODE, format!("{method} requires a foreground activity."))
            );
        }
        assert_eq!(registry.call_count(), 0);
    }

    #[test]
    fn test_detach_drops_pending_list() {
        let harness = Harness::new(scenario());
        let rx = harness.call("getInstalledApps", json!({}));

        harness.router.detach();
        harness.pump();

        assert!(rx.try_recv().is_err());
        assert!(!harness.router.is_attached());
        assert_eq!(
            harness.call_now("isAppInstalled", json!({"package_name": "A"})),
            MethodResponse::error(NO_ACTIVITY_CODE, "isAppInstalled requires a foreground activity.")
        );
    }

    #[test]
    fn test_reattach_starts_fresh_dispatcher() {
        let harness = Harness::new(scenario());
        harness.router.detach();
        assert_eq!(harness.router.dispatcher_state(), None);

        let worker = Arc::new(ManualExecutor::default());
        let delivery = Arc::new(RecordingDelivery::new());
        harness
            .router
            .attach_dispatcher(Dispatcher::with_executor(worker.clone(), delivery.clone()));
        assert_eq!(harness.router.dispatcher_state(), Some(DispatcherState::Idle));

        let rx = harness.call("getInstalledApps", json!({}));
        worker.run_all();
        delivery.run_all();

        let names: Vec<String> = records(rx.try_recv().unwrap())
            .into_iter()
            .map(|r| r.package_name)
            .collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_list_on_stopped_dispatcher_answers_no_activity() {
        let harness = Harness::new(scenario());
        if let Some(dispatcher) = harness.router.dispatcher.lock().unwrap().as_ref() {
            dispatcher.stop();
        }
        assert!(harness.router.is_attached());

        assert_eq!(
            harness.call_now("getInstalledApps", json!({})),
            MethodResponse::error(NO_ACTIVITY_CODE, "getInstalledApps requires a foreground activity.")
        );
        assert_eq!(harness.registry.call_count(), 0);
    }

    #[test]
    fn test_method_call_ignores_non_object_arguments() {
        let call = MethodCall::new("getApp", json!(["A"]));
        assert!(call.arguments.is_empty());
    }
}
