//! Thread-affinity assertions.
//!
//! A checker remembers the execution context that first used it: the task
//! runner whose worker was running, or the raw OS thread when no runner was.
//! Later calls from any other context report `false`. Use it through
//! [`dcheck_run_on!`](crate::dcheck_run_on) so release builds pay nothing.

use parking_lot::Mutex;
use std::thread::{self, ThreadId};

use crate::task_util::RunnerId;
use crate::task_util::task_runner_base::current_runner_id;

#[derive(Debug)]
struct CheckerState {
    attached: bool,
    valid_runner: Option<RunnerId>,
    valid_thread: ThreadId,
}

#[derive(Debug)]
pub struct SequenceCheckerImpl {
    state: Mutex<CheckerState>,
}

impl SequenceCheckerImpl {
    /// Attached to the calling context.
    pub fn new() -> Self {
        Self::with_attached(true)
    }

    /// Starts detached; binds to whichever context calls `is_current` first.
    pub fn new_detached() -> Self {
        Self::with_attached(false)
    }

    fn with_attached(attached: bool) -> Self {
        Self {
            state: Mutex::new(CheckerState {
                attached,
                valid_runner: current_runner_id(),
                valid_thread: thread::current().id(),
            }),
        }
    }

    pub fn is_current(&self) -> bool {
        let current_runner = current_runner_id();
        let current_thread = thread::current().id();
        let mut state = self.state.lock();
        if !state.attached {
            state.attached = true;
            state.valid_runner = current_runner;
            state.valid_thread = current_thread;
            return true;
        }
        if state.valid_runner.is_some() || current_runner.is_some() {
            return state.valid_runner == current_runner;
        }
        state.valid_thread == current_thread
    }

    /// Recorded context is kept until the next `is_current` overwrites it.
    pub fn detach(&self) {
        self.state.lock().attached = false;
    }

    pub fn expectation_to_string(&self) -> String {
        let current_runner = current_runner_id();
        let current_thread = thread::current().id();
        let state = self.state.lock();
        if !state.attached {
            return "Checker currently not attached.".to_string();
        }
        let mut message = format!(
            "# Expected: runner={} thread={:?}\n# Actual:   runner={} thread={:?}",
            describe_runner(state.valid_runner),
            state.valid_thread,
            describe_runner(current_runner),
            current_thread,
        );
        if state.valid_runner.is_some() || current_runner.is_some() {
            message.push_str(if state.valid_runner == current_runner {
                "\nTaskRunner matches."
            } else {
                "\nTaskRunner mismatch."
            });
        } else if state.valid_thread != current_thread {
            message.push_str("\nThread mismatch.");
        }
        message
    }
}

impl Default for SequenceCheckerImpl {
    fn default() -> Self {
        Self::new()
    }
}

fn describe_runner(runner: Option<RunnerId>) -> String {
    runner.map_or_else(|| "none".to_string(), |id| id.raw().to_string())
}

/// Release-build stand-in; every context is current.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequenceCheckerDoNothing;

impl SequenceCheckerDoNothing {
    pub fn new() -> Self {
        Self
    }

    pub fn new_detached() -> Self {
        Self
    }

    pub fn is_current(&self) -> bool {
        true
    }

    pub fn detach(&self) {}

    pub fn expectation_to_string(&self) -> String {
        "SequenceChecker disabled".to_string()
    }
}

#[cfg(any(debug_assertions, feature = "dcheck-always-on"))]
pub type SequenceChecker = SequenceCheckerImpl;

#[cfg(not(any(debug_assertions, feature = "dcheck-always-on")))]
pub type SequenceChecker = SequenceCheckerDoNothing;

/// Aborts (when dchecks are on) unless called from the checker's context.
#[macro_export]
macro_rules! dcheck_run_on {
    ($checker:expr) => {
        $crate::ave_dcheck!(
            ($checker).is_current(),
            "\n{}",
            ($checker).expectation_to_string()
        )
    };
}
