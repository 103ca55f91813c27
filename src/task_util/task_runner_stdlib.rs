use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::metrics::{RunnerMetrics, RunnerMetricsSnapshot};
use super::task::{Task, TaskOwnership};
use super::task_runner::TaskRunner;
use super::task_runner_base::{CurrentTaskRunnerSetter, RunnerId, TaskRunnerBase, next_runner_id};
use super::task_runner_factory::{Priority, TaskRunnerFactory};
use crate::count_down_latch::CountDownLatch;
use crate::error::Result;
use crate::thread::{Thread, ThreadPriority, panic_message};
use crate::time::{deadline_after, now_us, system_time_nanos};

struct TaskEntry {
    when_us: u64,
    order: u64,
    task: Option<Box<dyn Task>>,
    completion: Option<Arc<CountDownLatch>>,
}

impl Drop for TaskEntry {
    fn drop(&mut self) {
        // Drop the task before waking the poster so its destructor has run
        // by the time `post_*_and_wait` returns.
        drop(self.task.take());
        if let Some(completion) = self.completion.take() {
            completion.count_down();
        }
    }
}

// BinaryHeap is a max-heap: the earliest (deadline, order) must compare greatest.
impl Ord for TaskEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .when_us
            .cmp(&self.when_us)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for TaskEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TaskEntry {
    fn eq(&self, other: &Self) -> bool {
        self.when_us == other.when_us && self.order == other.order
    }
}

impl Eq for TaskEntry {}

struct QueueState {
    queue: BinaryHeap<TaskEntry>,
    need_quit: bool,
    next_order: u64,
}

struct RunnerShared {
    id: RunnerId,
    name: String,
    state: Mutex<QueueState>,
    condvar: Condvar,
    metrics: RunnerMetrics,
}

/// Task runner backed by one dedicated OS thread and a deadline-ordered heap.
pub struct TaskRunnerStdlib {
    shared: Arc<RunnerShared>,
    thread: Mutex<Option<Thread>>,
}

impl TaskRunnerStdlib {
    pub fn new(name: &str, priority: ThreadPriority) -> Result<Self> {
        let shared = Arc::new(RunnerShared {
            id: next_runner_id(),
            name: name.to_string(),
            state: Mutex::new(QueueState {
                queue: BinaryHeap::new(),
                need_quit: false,
                next_order: 0,
            }),
            condvar: Condvar::new(),
            metrics: RunnerMetrics::new(),
        });

        let worker = Arc::clone(&shared);
        let mut thread = Thread::new(
            move || {
                let _current = CurrentTaskRunnerSetter::new(worker.id);
                process_tasks(&worker);
            },
            name,
            priority,
        );
        thread.start(false)?;
        debug!(
            runner = name,
            id = shared.id.raw(),
            priority = priority.raw(),
            started_at_ns = system_time_nanos(),
            "task runner started"
        );

        Ok(Self {
            shared,
            thread: Mutex::new(Some(thread)),
        })
    }
}

impl TaskRunnerBase for TaskRunnerStdlib {
    fn destruct(&self) {
        self.shared.state.lock().need_quit = true;
        self.shared.condvar.notify_all();

        if self.is_current() {
            // Joining from the worker would deadlock; it exits once this task
            // returns. A failed try_lock means another caller is joining.
            if let Some(mut thread) = self.thread.try_lock()
                && let Some(mut worker) = thread.take()
            {
                worker.detach();
            }
            return;
        }

        // Held across the join so concurrent callers return only once the
        // worker has exited.
        let mut thread = self.thread.lock();
        let Some(worker) = thread.as_mut() else {
            return;
        };
        if let Err(err) = worker.join() {
            warn!(runner = %self.shared.name, error = %err, "task runner worker exited abnormally");
        }
        *thread = None;
    }

    fn post_delayed_task_and_wait(&self, task: Box<dyn Task>, delay_us: u64, wait: bool) {
        crate::ave_dcheck!(
            !(wait && self.is_current()),
            "blocking post to runner `{}` from its own worker would deadlock",
            self.shared.name
        );
        let completion = wait.then(|| Arc::new(CountDownLatch::new(1)));
        {
            let mut state = self.shared.state.lock();
            if state.need_quit {
                drop(state);
                self.shared.metrics.record_rejected();
                trace!(runner = %self.shared.name, "dropping task posted after shutdown");
                return;
            }
            let order = state.next_order;
            state.next_order += 1;
            state.queue.push(TaskEntry {
                when_us: deadline_after(delay_us),
                order,
                task: Some(task),
                completion: completion.clone(),
            });
            self.shared.metrics.record_post();
        }
        self.shared.condvar.notify_one();

        if let Some(completion) = completion {
            completion.wait();
        }
    }

    fn id(&self) -> RunnerId {
        self.shared.id
    }

    fn name(&self) -> &str {
        &self.shared.name
    }

    fn metrics(&self) -> RunnerMetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl Drop for TaskRunnerStdlib {
    fn drop(&mut self) {
        self.destruct();
    }
}

fn process_tasks(shared: &RunnerShared) {
    while let Some(mut entry) = next_due_entry(shared) {
        if let Some(task) = entry.task.take() {
            trace!(runner = %shared.name, order = entry.order, "running task");
            match panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
                Ok(TaskOwnership::TakeOwnership(task)) => drop(task),
                Ok(TaskOwnership::Retain) => {}
                Err(payload) => crate::checks::fatal(
                    file!(),
                    line!(),
                    &format!(
                        "task panicked on runner `{}`: {}",
                        shared.name,
                        panic_message(payload.as_ref())
                    ),
                ),
            }
        }
        shared.metrics.record_completion();
    }

    let discarded: Vec<TaskEntry> = shared.state.lock().queue.drain().collect();
    shared.metrics.record_discarded(discarded.len());
    debug!(
        runner = %shared.name,
        discarded = discarded.len(),
        "task runner stopped"
    );
    // Outside the lock: task destructors may post to this runner.
    drop(discarded);
}

/// Blocks until the earliest entry is due and pops it. Returns `None` once
/// shutdown was requested and nothing due is left.
fn next_due_entry(shared: &RunnerShared) -> Option<TaskEntry> {
    let mut state = shared.state.lock();
    loop {
        let now = now_us();
        match state.queue.peek().map(|entry| entry.when_us) {
            Some(when_us) if when_us <= now => return state.queue.pop(),
            _ if state.need_quit => return None,
            Some(when_us) => {
                // Re-checked on wake: an earlier entry may have been posted.
                shared
                    .condvar
                    .wait_for(&mut state, Duration::from_micros(when_us - now));
            }
            None => shared.condvar.wait(&mut state),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TaskRunnerStdlibFactory;

impl TaskRunnerFactory for TaskRunnerStdlibFactory {
    fn create_task_runner(&self, name: &str, priority: Priority) -> Result<TaskRunner> {
        let runner = TaskRunnerStdlib::new(name, priority.thread_priority())?;
        Ok(TaskRunner::new(Arc::new(runner)))
    }
}

pub fn create_task_runner_stdlib_factory() -> Box<dyn TaskRunnerFactory> {
    Box::new(TaskRunnerStdlibFactory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_util::task::to_task;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
    use std::thread;

    fn entry(when_us: u64, order: u64) -> TaskEntry {
        TaskEntry {
            when_us,
            order,
            task: None,
            completion: None,
        }
    }

    #[test]
    fn heap_pops_by_deadline_then_post_order() {
        let mut heap = BinaryHeap::new();
        heap.push(entry(20, 0));
        heap.push(entry(10, 2));
        heap.push(entry(10, 1));
        heap.push(entry(5, 3));

        let popped: Vec<_> = std::iter::from_fn(|| heap.pop())
            .map(|entry| (entry.when_us, entry.order))
            .collect();
        assert_eq!(popped, vec![(5, 3), (10, 1), (10, 2), (20, 0)]);
    }

    #[test]
    fn post_and_wait_observes_side_effects() {
        let runner = TaskRunnerStdlib::new("stdlib-wait", ThreadPriority::NORMAL).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let remote = Arc::clone(&counter);
        runner.post_delayed_task_and_wait(
            to_task(move || {
                remote.fetch_add(1, AtomicOrdering::SeqCst);
            }),
            1_000,
            true,
        );
        assert_eq!(counter.load(AtomicOrdering::SeqCst), 1);
        runner.destruct();
    }

    #[test]
    fn worker_reports_itself_as_current() {
        let runner = TaskRunnerStdlib::new("stdlib-current", ThreadPriority::NORMAL).unwrap();
        let runner = Arc::new(runner);
        let inside = Arc::new(AtomicBool::new(false));
        let (probe, seen) = (Arc::clone(&runner), Arc::clone(&inside));
        runner.post_delayed_task_and_wait(
            to_task(move || seen.store(probe.is_current(), AtomicOrdering::SeqCst)),
            0,
            true,
        );
        assert!(inside.load(AtomicOrdering::SeqCst));
        assert!(!runner.is_current());
        runner.destruct();
    }

    #[test]
    fn post_after_destruct_is_dropped() {
        let runner = TaskRunnerStdlib::new("stdlib-closed", ThreadPriority::NORMAL).unwrap();
        runner.destruct();

        let ran = Arc::new(AtomicBool::new(false));
        let remote = Arc::clone(&ran);
        runner.post_delayed_task_and_wait(
            to_task(move || remote.store(true, AtomicOrdering::SeqCst)),
            0,
            true,
        );
        assert!(!ran.load(AtomicOrdering::SeqCst));
        assert_eq!(runner.metrics().tasks_dropped, 1);
        // Idempotent.
        runner.destruct();
    }

    #[test]
    fn waiter_released_when_entry_is_discarded() {
        let runner = Arc::new(TaskRunnerStdlib::new("stdlib-discard", ThreadPriority::NORMAL).unwrap());
        let poster = Arc::clone(&runner);
        let waiter = thread::spawn(move || {
            poster.post_delayed_task_and_wait(to_task(|| {}), 10_000_000, true);
        });

        while runner.metrics().tasks_posted == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        runner.destruct();
        waiter.join().unwrap();

        let metrics = runner.metrics();
        assert_eq!(metrics.tasks_completed, 0);
        assert_eq!(metrics.tasks_dropped, 1);
        assert_eq!(metrics.tasks_pending, 0);
    }

    #[test]
    fn concurrent_destruct_callers_all_wait_for_the_worker() {
        let runner = Arc::new(TaskRunnerStdlib::new("stdlib-racing", ThreadPriority::NORMAL).unwrap());
        let started = Arc::new(CountDownLatch::new(1));
        let finished = Arc::new(AtomicBool::new(false));
        let (running, done) = (Arc::clone(&started), Arc::clone(&finished));
        runner.post_delayed_task_and_wait(
            to_task(move || {
                running.count_down();
                thread::sleep(Duration::from_millis(50));
                done.store(true, AtomicOrdering::SeqCst);
            }),
            0,
            false,
        );
        started.wait();

        let callers: Vec<_> = (0..3)
            .map(|_| {
                let (runner, finished) = (Arc::clone(&runner), Arc::clone(&finished));
                thread::spawn(move || {
                    runner.destruct();
                    finished.load(AtomicOrdering::SeqCst)
                })
            })
            .collect();
        for caller in callers {
            assert!(caller.join().unwrap(), "destruct returned before the worker exited");
        }
        assert!(runner.thread.lock().is_none());
    }

    #[test]
    fn destruct_from_own_worker_does_not_deadlock() {
        let runner = Arc::new(TaskRunnerStdlib::new("stdlib-self", ThreadPriority::NORMAL).unwrap());
        let inner = Arc::clone(&runner);
        runner.post_delayed_task_and_wait(to_task(move || inner.destruct()), 0, true);
        assert!(runner.thread.lock().is_none());
    }
}
