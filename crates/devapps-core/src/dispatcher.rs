//! Async dispatcher: background compute, foreground delivery.
//!
//! - One dedicated worker with a FIFO queue (no thread per call)
//! - Results are posted to the delivery context, never run on the worker
//! - `stop()` is a delivery-side guard: running work finishes, nothing
//!   more reaches the delivery context

use crate::delivery::DeliveryContext;
use crate::error::Result;
use crossbeam_channel::Sender;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Unit of work handed to an executor or delivery context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

const WORKER_THREAD_NAME: &str = "devapps-worker";

/// Background execution context.
pub trait Executor: Send + Sync {
    /// Queue `job`. Returns `false` once the executor has been shut down.
    fn execute(&self, job: Job) -> bool;

    /// Release the execution context. Jobs already queued may still be
    /// dequeued.
    fn shutdown(&self) {}
}

/// Single dedicated worker thread fed by an unbounded channel.
pub struct WorkerThread {
    sender: Mutex<Option<Sender<Job>>>,
}

impl WorkerThread {
    pub fn spawn(name: &str) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<Job>();

        std::thread::Builder::new().name(name.to_string()).spawn(move || {
            for job in rx.iter() {
                job();
            }
            debug!("Worker thread exiting");
        })?;

        Ok(Self {
            sender: Mutex::new(Some(tx)),
        })
    }
}

impl Executor for WorkerThread {
    fn execute(&self, job: Job) -> bool {
        match self.sender.lock() {
            Ok(guard) => guard.as_ref().is_some_and(|tx| tx.send(job).is_ok()),
            Err(_) => false,
        }
    }

    fn shutdown(&self) {
        // Dropping the sender ends the thread's receive loop
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
    }
}

/// Lifecycle state of a dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Running,
    Stopped,
}

#[derive(Default)]
struct Shared {
    stopped: AtomicBool,
    in_flight: AtomicUsize,
}

impl Shared {
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Counts a submitted job until it finishes or is dropped unrun.
struct InFlight(Arc<Shared>);

impl InFlight {
    fn new(shared: Arc<Shared>) -> Self {
        shared.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(shared)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs tasks on a worker and hands results to a delivery context.
pub struct Dispatcher {
    worker: Arc<dyn Executor>,
    delivery: Arc<dyn DeliveryContext>,
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Spawn the dedicated worker thread and bind it to `delivery`.
    pub fn start(delivery: Arc<dyn DeliveryContext>) -> Result<Self> {
        let worker = WorkerThread::spawn(WORKER_THREAD_NAME)?;
        info!("Dispatcher started");
        Ok(Self::with_executor(Arc::new(worker), delivery))
    }

    /// Build a dispatcher over caller-supplied execution contexts.
    pub fn with_executor(worker: Arc<dyn Executor>, delivery: Arc<dyn DeliveryContext>) -> Self {
        Self {
            worker,
            delivery,
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn state(&self) -> DispatcherState {
        if self.shared.is_stopped() {
            DispatcherState::Stopped
        } else if self.shared.in_flight.load(Ordering::SeqCst) > 0 {
            DispatcherState::Running
        } else {
            DispatcherState::Idle
        }
    }

    /// Run `task` on the worker, then `on_result` on the delivery context.
    ///
    /// Returns `false` if the task was not accepted (dispatcher stopped).
    pub fn run<T, F, C>(&self, task: F, on_result: C) -> bool
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        if self.shared.is_stopped() {
            debug!("Dispatcher stopped, ignoring submitted task");
            return false;
        }

        let shared = self.shared.clone();
        let delivery = self.delivery.clone();
        let in_flight = InFlight::new(self.shared.clone());

        let job: Job = Box::new(move || {
            // Counted as running until the result is handed over
            let _in_flight = in_flight;

            if shared.is_stopped() {
                debug!("Dispatcher stopped before task started, skipping");
                return;
            }

            let result = task();

            if shared.is_stopped() || !delivery.is_alive() {
                debug!("Delivery context gone, dropping result");
                return;
            }

            let guard = shared.clone();
            let posted = delivery.post(Box::new(move || {
                // stop() may land between post and delivery
                if !guard.is_stopped() {
                    on_result(result);
                }
            }));
            if !posted {
                debug!("Delivery context rejected result");
            }
        });

        self.worker.execute(job)
    }

    /// Stop the dispatcher and release its worker. Idempotent.
    pub fn stop(&self) {
        if !self.shared.stopped.swap(true, Ordering::SeqCst) {
            self.worker.shutdown();
            info!("Dispatcher stopped");
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
