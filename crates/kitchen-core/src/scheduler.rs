//! Owned, cancellable timers.
//!
//! Every delayed or periodic task on the kitchen screen (voice session
//! deadline, command-listening timeout, recognizer restarts, readiness tick)
//! is spawned through a [`Scheduler`]. Cancelling the scheduler aborts all of
//! them, so a shutdown leaves no orphaned timers behind.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

/// Handle to a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Default)]
struct SchedulerInner {
    next_id: AtomicU64,
    tasks: Mutex<HashMap<u64, JoinHandle<()>>>,
}

impl Drop for SchedulerInner {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, task) in tasks.drain() {
            task.abort();
        }
    }
}

/// A registry of spawned tasks with cancellable handles.
///
/// Cloning shares the registry. Dropping the last clone aborts every task
/// still registered.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task owned by this scheduler.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, future: F) -> TimerHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let task = tokio::spawn(future);
        let mut tasks = self.lock();
        tasks.retain(|_, t| !t.is_finished());
        tasks.insert(id, task);
        TimerHandle(id)
    }

    /// Run `future` once after `delay`.
    pub fn after<F>(&self, delay: Duration, future: F) -> TimerHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            future.await;
        })
    }

    /// Run `tick` every `period`, starting one period from now.
    pub fn every<F, Fut>(&self, period: Duration, mut tick: F) -> TimerHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                tick().await;
            }
        })
    }

    /// Abort a task. Returns whether it was still registered.
    pub fn cancel(&self, handle: TimerHandle) -> bool {
        match self.lock().remove(&handle.0) {
            Some(task) => {
                trace!(timer = handle.0, "TIMER_CANCELLED");
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Abort every task. Returns how many were still running.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<JoinHandle<()>> = self.lock().drain().map(|(_, t)| t).collect();
        let running = drained.iter().filter(|t| !t.is_finished()).count();
        for task in drained {
            task.abort();
        }
        if running > 0 {
            trace!(running, "TIMERS_CANCELLED");
        }
        running
    }

    /// Whether a task is registered and has not finished.
    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.lock().get(&handle.0).is_some_and(|t| !t.is_finished())
    }

    /// Number of registered tasks that have not finished.
    pub fn active_count(&self) -> usize {
        let mut tasks = self.lock();
        tasks.retain(|_, t| !t.is_finished());
        tasks.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, JoinHandle<()>>> {
        self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
