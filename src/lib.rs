//! Base utility layer of the ave audio/video engine.
//!
//! Serial task runners on dedicated threads, repeating tasks, named threads
//! with scheduling priority, and debug-only thread-affinity checks.

pub mod checks;
pub mod config;
pub mod count_down_latch;
pub mod error;
pub mod logging;
pub mod sequence_checker;
pub mod task_util;
pub mod thread;
pub mod time;

pub use config::BaseConfig;
pub use count_down_latch::CountDownLatch;
pub use error::{BaseError, Result};
pub use sequence_checker::SequenceChecker;
pub use task_util::{
    Priority, RepeatingTaskHandle, Task, TaskOwnership, TaskRunner, TaskRunnerBase, TaskRunnerFactory,
    create_default_task_runner_factory, to_task, to_task_with_cleanup,
};
pub use thread::{Thread, ThreadPriority};
