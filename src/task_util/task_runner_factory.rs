use serde::{Deserialize, Serialize};

use super::task_runner::TaskRunner;
use super::task_runner_stdlib::create_task_runner_stdlib_factory;
use crate::error::{BaseError, Result};
use crate::thread::ThreadPriority;

/// Abstract runner priority, mapped onto a thread priority by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn thread_priority(self) -> ThreadPriority {
        match self {
            Priority::Low => ThreadPriority::BACKGROUND,
            Priority::Normal => ThreadPriority::NORMAL,
            Priority::High => ThreadPriority::AUDIO,
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = BaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" | "background" => Ok(Priority::Low),
            "normal" | "default" => Ok(Priority::Normal),
            "high" | "audio" => Ok(Priority::High),
            _ => Err(BaseError::InvalidPriority(s.to_string())),
        }
    }
}

/// Builds independent task runners. Every call costs one OS thread.
pub trait TaskRunnerFactory: Send + Sync {
    fn create_task_runner(&self, name: &str, priority: Priority) -> Result<TaskRunner>;
}

pub fn create_default_task_runner_factory() -> Box<dyn TaskRunnerFactory> {
    create_task_runner_stdlib_factory()
}
