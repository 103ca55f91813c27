use std::cmp::max;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Counters kept by each task runner.
#[derive(Debug, Default)]
pub struct RunnerMetrics {
    posted: AtomicU64,
    completed: AtomicU64,
    dropped: AtomicU64,
    pending: AtomicI64,
}

impl RunnerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_post(&self) {
        self.posted.fetch_add(1, Ordering::Relaxed);
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completion(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.pending.fetch_sub(1, Ordering::Relaxed);
    }

    /// A task posted after shutdown; it never entered the queue.
    pub fn record_rejected(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Queued tasks discarded at shutdown.
    pub fn record_discarded(&self, count: usize) {
        if count == 0 {
            return;
        }
        let count = count as u64;
        self.dropped.fetch_add(count, Ordering::Relaxed);
        self.pending
            .fetch_sub(i64::try_from(count).unwrap_or(i64::MAX), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunnerMetricsSnapshot {
        RunnerMetricsSnapshot {
            tasks_posted: self.posted.load(Ordering::Relaxed),
            tasks_completed: self.completed.load(Ordering::Relaxed),
            tasks_dropped: self.dropped.load(Ordering::Relaxed),
            tasks_pending: max(self.pending.load(Ordering::Relaxed), 0) as u64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunnerMetricsSnapshot {
    pub tasks_posted: u64,
    pub tasks_completed: u64,
    pub tasks_dropped: u64,
    pub tasks_pending: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_tracks_posts_minus_outcomes() {
        let metrics = RunnerMetrics::new();
        for _ in 0..3 {
            metrics.record_post();
        }
        metrics.record_completion();
        metrics.record_discarded(1);
        metrics.record_rejected();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tasks_posted, 3);
        assert_eq!(snapshot.tasks_completed, 1);
        assert_eq!(snapshot.tasks_dropped, 2);
        assert_eq!(snapshot.tasks_pending, 1);
    }
}
