//! Delivery context: the thread results are handed back on.
//!
//! The host owns a `DeliveryPump` and drains it from its foreground loop;
//! background work only ever holds the cloneable `DeliveryHandle`.

use crate::dispatcher::Job;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Where completed work is marshaled to.
pub trait DeliveryContext: Send + Sync {
    /// Queue `job` to run on the delivery thread.
    /// Returns `false` if the context has been torn down.
    fn post(&self, job: Job) -> bool;

    /// Whether the context can still run jobs.
    fn is_alive(&self) -> bool;
}

/// Create a connected handle/pump pair.
pub fn delivery_channel() -> (DeliveryHandle, DeliveryPump) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let alive = Arc::new(AtomicBool::new(true));
    (
        DeliveryHandle {
            tx,
            alive: alive.clone(),
        },
        DeliveryPump { rx, alive },
    )
}

/// Sending side, handed to the dispatcher.
#[derive(Clone)]
pub struct DeliveryHandle {
    tx: Sender<Job>,
    alive: Arc<AtomicBool>,
}

impl DeliveryContext for DeliveryHandle {
    fn post(&self, job: Job) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.tx.send(job).is_ok()
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Receiving side, drained on the delivery thread.
pub struct DeliveryPump {
    rx: Receiver<Job>,
    alive: Arc<AtomicBool>,
}

impl DeliveryPump {
    /// Raw receiver, for use in a `crossbeam_channel::select!` loop.
    pub fn receiver(&self) -> &Receiver<Job> {
        &self.rx
    }

    /// Run every job queued so far. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.is_alive() {
            match self.rx.try_recv() {
                Ok(job) => {
                    job();
                    ran += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        ran
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Tear the context down. Queued jobs are discarded.
    pub fn close(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            let dropped = self.rx.try_iter().count();
            debug!("Delivery context closed, {} pending job(s) dropped", dropped);
        }
    }
}

impl Drop for DeliveryPump {
    fn drop(&mut self) {
        self.close();
    }
}
