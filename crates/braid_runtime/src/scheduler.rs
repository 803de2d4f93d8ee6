//! Trackable task scheduler.
//!
//! A thin cooperative layer over `tokio::spawn` that counts the units of
//! work belonging to one request and exposes an idle signal. The signal
//! drives request completion (a result tree is only sealed once the
//! scheduler is idle) and gives tests a synchronization point.
//!
//! The in-flight count lives in a `watch` channel: waiters observe the
//! transition to zero through `Receiver::wait_for`, which re-checks the
//! value under the channel's lock, so releasing waiters happens-after
//! the decrement that reached zero and a concurrent increment keeps the
//! scheduler non-idle without spurious releases.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Scheduler statistics.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    /// Total units submitted.
    pub tasks_submitted: AtomicUsize,

    /// Total units completed (success, failure, or cancellation).
    pub tasks_completed: AtomicUsize,
}

/// Counts in-flight units of work and reports idleness.
#[derive(Debug, Clone)]
pub struct TrackableScheduler {
    inflight: Arc<watch::Sender<usize>>,
    stats: Arc<SchedulerStats>,
}

impl Default for TrackableScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackableScheduler {
    /// Creates an idle scheduler.
    pub fn new() -> Self {
        let (inflight, _) = watch::channel(0);
        Self {
            inflight: Arc::new(inflight),
            stats: Arc::new(SchedulerStats::default()),
        }
    }

    /// Returns true iff no tracked unit is in flight.
    pub fn is_idle(&self) -> bool {
        *self.inflight.borrow() == 0
    }

    /// Returns the current in-flight count.
    pub fn inflight(&self) -> usize {
        *self.inflight.borrow()
    }

    /// Suspends until the in-flight count is zero.
    ///
    /// Resolves immediately when the scheduler is already idle, in
    /// particular before any work has been scheduled.
    pub async fn wait_until_idle(&self) {
        let mut rx = self.inflight.subscribe();
        // The sender lives in `self`, so `wait_for` cannot fail here.
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    /// Spawns a tracked unit of work onto the runtime.
    ///
    /// The count is incremented before the unit becomes visible to the
    /// underlying scheduler and decremented when the unit finishes for
    /// any reason, including panic and abort.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let guard = self.track();
        tokio::spawn(async move {
            let _guard = guard;
            future.await
        })
    }

    /// Registers one externally-run unit of work.
    ///
    /// The unit counts as in flight until the returned guard is dropped.
    pub fn track(&self) -> TaskGuard {
        self.inflight.send_modify(|count| *count += 1);
        self.stats.tasks_submitted.fetch_add(1, Ordering::Relaxed);
        TaskGuard {
            inflight: Arc::clone(&self.inflight),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Gets scheduler statistics.
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }
}

/// Guard for one in-flight unit of work.
///
/// Dropping the guard decrements the count; when the count reaches zero
/// all pending `wait_until_idle` callers are released.
#[derive(Debug)]
pub struct TaskGuard {
    inflight: Arc<watch::Sender<usize>>,
    stats: Arc<SchedulerStats>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.stats.tasks_completed.fetch_add(1, Ordering::Relaxed);
        self.inflight
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}
