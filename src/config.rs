//! Runtime configuration for logging and task runner defaults

use serde::{Deserialize, Serialize};

use crate::task_util::Priority;

/// Library configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseConfig {
    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
    /// Colour the log output
    pub log_ansi: bool,
    /// Include the emitting thread's name in each log line
    pub log_thread_names: bool,
    /// Priority used when the caller has no preference
    pub default_priority: Priority,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            log_ansi: true,
            log_thread_names: true,
            default_priority: Priority::Normal,
        }
    }
}

impl BaseConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`; unset or malformed values keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(filter) = lookup("AVE_LOG")
            && !filter.trim().is_empty()
        {
            config.log_filter = filter;
        }

        if let Some(ansi) = lookup("AVE_LOG_ANSI")
            && let Some(ansi) = parse_flag(&ansi)
        {
            config.log_ansi = ansi;
        }

        if let Some(names) = lookup("AVE_LOG_THREAD_NAMES")
            && let Some(names) = parse_flag(&names)
        {
            config.log_thread_names = names;
        }

        if let Some(priority) = lookup("AVE_TASK_RUNNER_PRIORITY")
            && let Ok(priority) = priority.parse()
        {
            config.default_priority = priority;
        }

        config
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
