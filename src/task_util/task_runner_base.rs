use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

use super::metrics::RunnerMetricsSnapshot;
use super::task::Task;

/// Identity of a task runner, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunnerId(u64);

impl RunnerId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

static NEXT_RUNNER_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_runner_id() -> RunnerId {
    RunnerId(NEXT_RUNNER_ID.fetch_add(1, Ordering::Relaxed))
}

/// The executor interface behind a [`TaskRunner`](super::TaskRunner).
///
/// Tasks posted to one runner execute one at a time, in deadline order, with
/// ties broken by post order.
pub trait TaskRunnerBase: Send + Sync {
    /// Stops the runner: already-due tasks still run, later ones are dropped,
    /// and the worker is joined (unless called from the worker itself).
    /// Posting afterwards silently drops the task.
    fn destruct(&self);

    fn post_task(&self, task: Box<dyn Task>) {
        self.post_delayed_task(task, 0);
    }

    fn post_delayed_task(&self, task: Box<dyn Task>, delay_us: u64) {
        self.post_delayed_task_and_wait(task, delay_us, false);
    }

    /// With `wait`, blocks until the task has run or been discarded. Calling
    /// that from the runner's own worker deadlocks.
    fn post_delayed_task_and_wait(&self, task: Box<dyn Task>, delay_us: u64, wait: bool);

    fn is_current(&self) -> bool {
        current_runner_id() == Some(self.id())
    }

    fn id(&self) -> RunnerId;

    fn name(&self) -> &str;

    fn metrics(&self) -> RunnerMetricsSnapshot;
}

thread_local! {
    static CURRENT_RUNNER: Cell<Option<RunnerId>> = const { Cell::new(None) };
}

/// The runner whose worker is executing on this thread, if any.
pub(crate) fn current_runner_id() -> Option<RunnerId> {
    CURRENT_RUNNER.with(Cell::get)
}

/// Marks the calling thread as `runner`'s worker until dropped.
pub(crate) struct CurrentTaskRunnerSetter {
    previous: Option<RunnerId>,
}

impl CurrentTaskRunnerSetter {
    pub(crate) fn new(runner: RunnerId) -> Self {
        let previous = CURRENT_RUNNER.with(|current| current.replace(Some(runner)));
        Self { previous }
    }
}

impl Drop for CurrentTaskRunnerSetter {
    fn drop(&mut self) {
        CURRENT_RUNNER.with(|current| current.set(self.previous));
    }
}
