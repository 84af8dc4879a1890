//! Per-unit debounced tasks
//!
//! Scheduling a task for a unit cancels the one still pending for it, so rapid
//! triggers collapse into a single run after the last one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct Pending {
    generation: u64,
    task: JoinHandle<()>,
}

#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Arc<Mutex<HashMap<String, Pending>>>,
    generation: Arc<Mutex<u64>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(Mutex::new(0)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule<F>(&self, unit: &str, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_after(unit, self.delay, task);
    }

    /// Cancel the unit's pending task and run `task` after `delay`.
    ///
    /// Outside a tokio runtime there is nothing to schedule on, so the task
    /// runs immediately.
    pub fn schedule_after<F>(&self, unit: &str, delay: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            warn!(unit, "no async runtime, running task without delay");
            self.cancel(unit);
            task();
            return;
        };

        let generation = match self.generation.lock() {
            Ok(mut g) => {
                *g += 1;
                *g
            }
            Err(_) => 0,
        };

        let Ok(mut pending) = self.pending.lock() else {
            return;
        };

        // The map stays locked until the entry exists, so the task always finds it
        let shared = self.pending.clone();
        let key = unit.to_string();
        let spawned = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let current = shared.lock().ok().and_then(|mut p| match p.get(&key) {
                Some(entry) if entry.generation == generation => p.remove(&key),
                _ => None,
            });
            if current.is_some() {
                task();
            }
        });

        if let Some(previous) = pending.insert(unit.to_string(), Pending { generation, task: spawned }) {
            debug!(unit, "rescheduled pending task");
            previous.task.abort();
        }
    }

    /// Cancel the unit's pending task; `true` if there was one
    pub fn cancel(&self, unit: &str) -> bool {
        let previous = self.pending.lock().ok().and_then(|mut p| p.remove(unit));
        match previous {
            Some(entry) => {
                entry.task.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, unit: &str) -> bool {
        self.pending.lock().map(|p| p.contains_key(unit)).unwrap_or(false)
    }

    pub fn cancel_all(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            for (_, entry) in pending.drain() {
                entry.task.abort();
            }
        }
    }
}
