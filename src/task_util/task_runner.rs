use std::sync::Arc;

use super::metrics::RunnerMetricsSnapshot;
use super::task::{Task, to_task};
use super::task_runner_base::{RunnerId, TaskRunnerBase};

/// Owning handle to a task runner.
///
/// Dropping it destructs the runner: due tasks drain, delayed ones are
/// dropped, and the worker thread is joined before the drop returns. Shared
/// handles obtained through [`TaskRunner::get`] keep the object alive but
/// can only post into a stopped runner afterwards.
pub struct TaskRunner {
    inner: Arc<dyn TaskRunnerBase>,
}

impl TaskRunner {
    pub fn new(inner: Arc<dyn TaskRunnerBase>) -> Self {
        Self { inner }
    }

    pub fn get(&self) -> &Arc<dyn TaskRunnerBase> {
        &self.inner
    }

    pub fn id(&self) -> RunnerId {
        self.inner.id()
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn metrics(&self) -> RunnerMetricsSnapshot {
        self.inner.metrics()
    }

    /// True when called from this runner's worker thread.
    pub fn is_current(&self) -> bool {
        self.inner.is_current()
    }

    pub fn post_task(&self, task: Box<dyn Task>) {
        self.inner.post_task(task);
    }

    pub fn post_fn<F>(&self, closure: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_task(to_task(closure));
    }

    pub fn post_delayed_task(&self, task: Box<dyn Task>, delay_us: u64) {
        self.inner.post_delayed_task(task, delay_us);
    }

    pub fn post_delayed_fn<F>(&self, closure: F, delay_us: u64)
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_delayed_task(to_task(closure), delay_us);
    }

    /// Blocks until the task has run. Must not be called from this runner.
    pub fn post_task_and_wait(&self, task: Box<dyn Task>) {
        self.post_delayed_task_and_wait(task, 0);
    }

    pub fn post_fn_and_wait<F>(&self, closure: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_task_and_wait(to_task(closure));
    }

    pub fn post_delayed_task_and_wait(&self, task: Box<dyn Task>, delay_us: u64) {
        self.inner.post_delayed_task_and_wait(task, delay_us, true);
    }

    pub fn post_delayed_fn_and_wait<F>(&self, closure: F, delay_us: u64)
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_delayed_task_and_wait(to_task(closure), delay_us);
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        self.inner.destruct();
    }
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("id", &self.inner.id())
            .field("name", &self.inner.name())
            .finish()
    }
}
