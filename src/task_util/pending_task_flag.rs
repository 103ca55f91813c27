use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One-way alive flag shared between a repeating task and its handle.
#[derive(Debug)]
pub struct PendingTaskFlag {
    alive: AtomicBool,
}

impl PendingTaskFlag {
    pub fn create() -> Arc<Self> {
        Arc::new(Self {
            alive: AtomicBool::new(true),
        })
    }

    pub fn set_not_alive(&self) {
        self.alive.store(false, Ordering::Release);
    }

    pub fn alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}
