//! Periodic Sync Scheduler
//!
//! Drives repeated bulk passes on a fixed cadence. At most one schedule is
//! active: starting again replaces the previous one. Each firing spawns the
//! pass as its own task, so stopping the scheduler only prevents future
//! firings and never cancels a pass already in flight. A firing that
//! arrives while the previous pass is still running is skipped, not queued.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

#[derive(Default)]
pub struct SyncScheduler {
    handle: Mutex<Option<JoinHandle<()>>>,
    in_flight: Arc<AtomicBool>,
}

impl SyncScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` to run every `interval`. Replaces any existing
    /// schedule; the first firing happens one full interval from now.
    pub fn start<F, Fut>(&self, interval: Duration, task: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();

        let in_flight = Arc::clone(&self.in_flight);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick of a tokio interval completes immediately;
            // consume it so firings start one interval out.
            ticker.tick().await;
            loop {
                ticker.tick().await;

                if in_flight.swap(true, Ordering::SeqCst) {
                    tracing::warn!("previous sync pass still running, skipping this firing");
                    continue;
                }

                let guard = Arc::clone(&in_flight);
                let pass = task();
                tokio::spawn(async move {
                    pass.await;
                    guard.store(false, Ordering::SeqCst);
                });
            }
        });

        if let Ok(mut slot) = self.handle.lock() {
            *slot = Some(handle);
        }
    }

    /// Cancel the active schedule, if any. Returns whether a schedule was
    /// actually cancelled. An in-flight pass keeps running.
    pub fn stop(&self) -> bool {
        let Ok(mut slot) = self.handle.lock() else {
            return false;
        };
        match slot.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
