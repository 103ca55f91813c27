//! Serial task execution on dedicated worker threads.
//!
//! A [`TaskRunner`] owns one OS thread that runs posted [`Task`]s one at a
//! time, ordered by deadline and then by post order. Runners come from a
//! [`TaskRunnerFactory`]; periodic work goes through [`RepeatingTaskHandle`].

pub mod metrics;
pub mod pending_task_flag;
pub mod repeating_task;
pub mod task;
pub mod task_runner;
pub mod task_runner_base;
pub mod task_runner_factory;
pub mod task_runner_stdlib;

pub use metrics::RunnerMetricsSnapshot;
pub use pending_task_flag::PendingTaskFlag;
pub use repeating_task::RepeatingTaskHandle;
pub use task::{Task, TaskOwnership, to_task, to_task_with_cleanup};
pub use task_runner::TaskRunner;
pub use task_runner_base::{RunnerId, TaskRunnerBase};
pub use task_runner_factory::{Priority, TaskRunnerFactory, create_default_task_runner_factory};
pub use task_runner_stdlib::{TaskRunnerStdlib, TaskRunnerStdlibFactory, create_task_runner_stdlib_factory};
