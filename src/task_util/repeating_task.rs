use std::sync::{Arc, Weak};

use tracing::trace;

use super::pending_task_flag::PendingTaskFlag;
use super::task::{Task, TaskOwnership};
use super::task_runner::TaskRunner;
use super::task_runner_base::TaskRunnerBase;
use crate::sequence_checker::SequenceChecker;
use crate::time::{deadline_after, now_us};

/// Self-reposting task. The closure returns the delay in microseconds until
/// its next run; lateness of the current run is taken off that delay.
struct RepeatingTask<F> {
    runner: Weak<dyn TaskRunnerBase>,
    next_run_time_us: u64,
    alive_flag: Arc<PendingTaskFlag>,
    // Binds to the runner on the first run; every later run must match.
    sequence_checker: SequenceChecker,
    closure: F,
}

impl<F> RepeatingTask<F>
where
    F: FnMut() -> u64 + Send + 'static,
{
    fn new(
        runner: Weak<dyn TaskRunnerBase>,
        first_delay_us: u64,
        alive_flag: Arc<PendingTaskFlag>,
        closure: F,
    ) -> Self {
        Self {
            runner,
            next_run_time_us: deadline_after(first_delay_us),
            alive_flag,
            sequence_checker: SequenceChecker::new_detached(),
            closure,
        }
    }

    /// Advances the target run time by `delay_us` and returns the delay
    /// actually scheduled, shortened by how late `now_us` is.
    fn schedule_next(&mut self, delay_us: u64, now_us: u64) -> u64 {
        let drift_us = now_us.saturating_sub(self.next_run_time_us);
        self.next_run_time_us = self.next_run_time_us.saturating_add(delay_us);
        delay_us.saturating_sub(drift_us)
    }
}

impl<F> Task for RepeatingTask<F>
where
    F: FnMut() -> u64 + Send + 'static,
{
    fn run(mut self: Box<Self>) -> TaskOwnership {
        if !self.alive_flag.alive() {
            return TaskOwnership::TakeOwnership(self);
        }

        crate::dcheck_run_on!(self.sequence_checker);
        let delay_us = (self.closure)();
        let scheduled_us = self.schedule_next(delay_us, now_us());

        // Stop may have been called while the closure ran.
        if !self.alive_flag.alive() {
            return TaskOwnership::TakeOwnership(self);
        }
        let Some(runner) = self.runner.upgrade() else {
            return TaskOwnership::TakeOwnership(self);
        };
        trace!(runner = runner.name(), delay_us = scheduled_us, "reposting repeating task");
        runner.post_delayed_task(self, scheduled_us);
        TaskOwnership::Retain
    }
}

/// Controls a repeating task started on a [`TaskRunner`].
///
/// Dropping the handle leaves the task running; call [`stop`](Self::stop).
/// Stopping is best-effort: one more run may already be under way or queued.
#[derive(Debug, Default)]
pub struct RepeatingTaskHandle {
    flag: Option<Arc<PendingTaskFlag>>,
}

impl RepeatingTaskHandle {
    pub fn start<F>(runner: &TaskRunner, closure: F) -> Self
    where
        F: FnMut() -> u64 + Send + 'static,
    {
        Self::delayed_start(runner, 0, closure)
    }

    pub fn delayed_start<F>(runner: &TaskRunner, first_delay_us: u64, closure: F) -> Self
    where
        F: FnMut() -> u64 + Send + 'static,
    {
        let flag = PendingTaskFlag::create();
        let task = RepeatingTask::new(
            Arc::downgrade(runner.get()),
            first_delay_us,
            Arc::clone(&flag),
            closure,
        );
        runner.post_delayed_task(Box::new(task), first_delay_us);
        Self { flag: Some(flag) }
    }

    pub fn stop(&mut self) {
        if let Some(flag) = self.flag.take() {
            flag.set_not_alive();
        }
    }

    pub fn running(&self) -> bool {
        self.flag.as_ref().is_some_and(|flag| flag.alive())
    }
}
