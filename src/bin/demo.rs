use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use ave_base::logging::init_logging;
use ave_base::{
    BaseConfig, CountDownLatch, Priority, RepeatingTaskHandle, Thread, ThreadPriority,
    create_default_task_runner_factory,
};

#[derive(Parser, Debug)]
#[command(name = "ave-base-demo", version, about = "Exercise ave task runners and threads")]
struct DemoCli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Post immediate, delayed and repeating tasks to one runner.
    Runner {
        #[arg(long, default_value = "demo-runner")]
        /// Worker thread name.
        name: String,

        #[arg(long)]
        /// low, normal or high (defaults to AVE_TASK_RUNNER_PRIORITY).
        priority: Option<Priority>,

        #[arg(long, default_value_t = 5)]
        /// Number of repeating-task ticks to wait for.
        ticks: u32,

        #[arg(long, default_value_t = 10_000)]
        /// Repeating-task period in microseconds.
        period_us: u64,
    },
    /// Run a named thread for a few iterations and join it.
    Thread {
        #[arg(long, default_value = "demo-thread")]
        name: String,

        #[arg(long, default_value_t = 3)]
        iterations: u32,
    },
}

fn main() -> Result<()> {
    let config = BaseConfig::from_env();
    init_logging(&config).context("failed to set up logging")?;

    match DemoCli::parse().command {
        Command::Runner {
            name,
            priority,
            ticks,
            period_us,
        } => run_runner(&name, priority.unwrap_or(config.default_priority), ticks, period_us),
        Command::Thread { name, iterations } => run_thread(name, iterations),
    }
}

fn run_runner(name: &str, priority: Priority, ticks: u32, period_us: u64) -> Result<()> {
    let factory = create_default_task_runner_factory();
    let runner = factory
        .create_task_runner(name, priority)
        .with_context(|| format!("failed to create task runner `{name}`"))?;

    runner.post_fn(|| info!("immediate task"));
    runner.post_delayed_fn(|| info!("delayed task"), 5_000);

    let latch = Arc::new(CountDownLatch::new(ticks as usize));
    let fired = Arc::new(AtomicU32::new(0));
    let (tick_latch, tick_count) = (Arc::clone(&latch), Arc::clone(&fired));
    let mut handle = RepeatingTaskHandle::start(&runner, move || {
        let tick = tick_count.fetch_add(1, Ordering::Relaxed) + 1;
        info!(tick, "repeating task");
        tick_latch.count_down();
        period_us
    });

    let budget = Duration::from_micros(period_us.saturating_mul(u64::from(ticks) + 10));
    let completed = latch.wait_for(budget);
    handle.stop();
    // Queue order guarantees any in-flight repeat has finished.
    runner.post_fn_and_wait(|| {});

    let metrics = runner.metrics();
    info!(
        completed,
        ticks = fired.load(Ordering::Relaxed),
        posted = metrics.tasks_posted,
        ran = metrics.tasks_completed,
        "runner demo finished"
    );
    Ok(())
}

fn run_thread(name: String, iterations: u32) -> Result<()> {
    let thread_name = name.clone();
    let mut thread = Thread::new(
        move || {
            for iteration in 0..iterations {
                info!(thread = %thread_name, iteration, "working");
                std::thread::sleep(Duration::from_millis(10));
            }
        },
        name,
        ThreadPriority::NORMAL,
    );
    thread.start(false)?;
    info!(tid = thread.tid(), "thread started");
    thread.join()?;
    info!("thread joined");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![expect(clippy::panic, reason = "Panicking on test failures is acceptable")]

    use super::*;

    #[test]
    fn runner_command_parses_priority() {
        let cli = DemoCli::parse_from(["ave-base-demo", "runner", "--priority", "high", "--ticks", "2"]);
        match cli.command {
            Command::Runner {
                priority, ticks, ..
            } => {
                assert_eq!(priority, Some(Priority::High));
                assert_eq!(ticks, 2);
            }
            Command::Thread { .. } => panic!("expected runner command"),
        }
    }

    #[test]
    fn thread_command_uses_defaults() {
        let cli = DemoCli::parse_from(["ave-base-demo", "thread"]);
        match cli.command {
            Command::Thread { name, iterations } => {
                assert_eq!(name, "demo-thread");
                assert_eq!(iterations, 3);
            }
            Command::Runner { .. } => panic!("expected thread command"),
        }
    }
}
