//! device-apps - installed-app inventory over a JSON-lines method channel
//!
//! Requests arrive on stdin, responses leave on stdout, logs go to stderr.
//! The main thread is the delivery context: background listings hand their
//! results back here before they are written out.

mod channel;
mod config;
mod services;

use config::HostConfig;
use crossbeam_channel::select;
use devapps_core::{DeliveryPump, DispatcherState, Router, delivery_channel};
use log::{debug, info, warn};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

const DRAIN_POLL_INTERVAL_MS: u64 = 50;

fn main() -> Result<(), Box<dyn Error>> {
    let (config, config_error) = match HostConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (HostConfig::default(), Some(e)),
    };
    init_logging(&config);
    if let Some(e) = config_error {
        warn!("Ignoring invalid config file: {}", e);
    }

    info!("Starting device-apps...");

    let router = services::apps::build_router(&config);
    let (handle, pump) = delivery_channel();
    router.attach(Arc::new(handle))?;

    let requests = channel::spawn_reader()?;
    let jobs = pump.receiver();

    loop {
        select! {
            recv(requests) -> line => match line {
                Ok(line) => dispatch(&router, &line),
                Err(_) => break,
            },
            recv(jobs) -> job => {
                if let Ok(job) = job {
                    job();
                }
            },
        }
    }

    debug!("Request stream closed, draining pending work");
    drain_pending(&router, &pump);
    shutdown(&router, &pump);
    info!("device-apps stopped");

    Ok(())
}

/// Run delivery jobs until no listing is in flight and none is queued.
fn drain_pending(router: &Router, pump: &DeliveryPump) {
    let jobs = pump.receiver();
    while router.dispatcher_state() == Some(DispatcherState::Running) || !jobs.is_empty() {
        select! {
            recv(jobs) -> job => {
                if let Ok(job) = job {
                    job();
                }
            },
            default(Duration::from_millis(DRAIN_POLL_INTERVAL_MS)) => {}
        }
    }
}

/// View teardown: stop the dispatcher, then drop anything still queued.
fn shutdown(router: &Router, pump: &DeliveryPump) {
    router.detach();
    pump.close();
}

fn init_logging(config: &HostConfig) {
    env_logger::Builder::new()
        .parse_filters(&config.log_level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();
}

/// Route one request line. The reply runs on this thread, either right away
/// or later through the delivery pump.
fn dispatch(router: &Router, line: &str) {
    match channel::decode(line) {
        Ok((id, call)) => {
            router.handle(call, move |response| {
                channel::send(&channel::Response::new(id, response));
            });
        }
        Err(response) => channel::send(&response),
    }
}
