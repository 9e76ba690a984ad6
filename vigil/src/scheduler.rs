//! Periodic task runtime.
//!
//! One serialized loop per task keeps same-task runs from overlapping;
//! missed ticks are skipped rather than queued. Labeled queues are bounded
//! by semaphores so a long discovery run can never starve the liveness
//! cadence, and every run is cut off at the configured wall-clock ceiling.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Labeled task queues with independent worker budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueLabel {
    /// Expensive upstream searches.
    Discovery,
    /// Cheap batched status checks.
    Liveness,
    /// Catalog-only and bookkeeping tasks.
    Maintenance,
}

impl QueueLabel {
    /// Queue name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Liveness => "liveness",
            Self::Maintenance => "maintenance",
        }
    }
}

pub(crate) struct Scheduler {
    discovery: Arc<Semaphore>,
    liveness: Arc<Semaphore>,
    maintenance: Arc<Semaphore>,
    time_limit: Duration,
}

impl Scheduler {
    pub(crate) fn new(workers_per_queue: usize, time_limit: Duration) -> Self {
        let slots = workers_per_queue.max(1);
        Self {
            discovery: Arc::new(Semaphore::new(slots)),
            liveness: Arc::new(Semaphore::new(slots)),
            maintenance: Arc::new(Semaphore::new(slots)),
            time_limit,
        }
    }

    fn queue(&self, label: QueueLabel) -> Arc<Semaphore> {
        match label {
            QueueLabel::Discovery => self.discovery.clone(),
            QueueLabel::Liveness => self.liveness.clone(),
            QueueLabel::Maintenance => self.maintenance.clone(),
        }
    }

    /// Spawn a fixed-period loop. Runs of the same task are serialized; a
    /// tick that fires while the previous run is still executing is
    /// dropped by the skip behavior.
    pub(crate) fn spawn_periodic<F>(
        &self,
        name: &str,
        label: QueueLabel,
        period: Duration,
        run: F,
    ) -> JoinHandle<()>
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + 'static,
    {
        let name = name.to_string();
        let queue = self.queue(label);
        let time_limit = self.time_limit;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                Self::run_bounded(&name, label, &queue, time_limit, run()).await;
            }
        })
    }

    /// Spawn a wall-clock loop driven by a cron schedule (UTC).
    pub(crate) fn spawn_cron<F>(
        &self,
        name: &str,
        label: QueueLabel,
        schedule: cron::Schedule,
        run: F,
    ) -> JoinHandle<()>
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + 'static,
    {
        let name = name.to_string();
        let queue = self.queue(label);
        let time_limit = self.time_limit;
        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let Some(next) = schedule.after(&now).next() else {
                    warn!(task = %name, "cron schedule has no future firings");
                    return;
                };
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait).await;
                Self::run_bounded(&name, label, &queue, time_limit, run()).await;
            }
        })
    }

    async fn run_bounded(
        name: &str,
        label: QueueLabel,
        queue: &Arc<Semaphore>,
        time_limit: Duration,
        fut: BoxFuture<'static, ()>,
    ) {
        // Closed semaphores cannot happen; the permit just bounds the queue.
        let Ok(_permit) = queue.clone().acquire_owned().await else {
            return;
        };
        debug!(task = name, queue = label.as_str(), "task starting");
        if tokio::time::timeout(time_limit, fut).await.is_err() {
            // Committed catalog writes stand; idempotent upserts make the
            // interruption safe.
            warn!(task = name, "task hit its time limit and was cancelled");
        }
    }
}

/// Handle over the spawned task loops.
///
/// Dropping the handle aborts every loop; in-flight catalog writes that
/// already committed stand.
#[derive(Debug)]
pub struct VigilHandle {
    handles: Vec<JoinHandle<()>>,
}

impl VigilHandle {
    pub(crate) fn new(handles: Vec<JoinHandle<()>>) -> Self {
        Self { handles }
    }

    /// Number of task loops running.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.handles.len()
    }

    /// Abort every task loop.
    pub fn shutdown(mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for VigilHandle {
    fn drop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}
