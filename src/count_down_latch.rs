use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// Blocks waiters until `count_down` has been called `count` times.
#[derive(Debug)]
pub struct CountDownLatch {
    count: Mutex<usize>,
    condvar: Condvar,
}

impl CountDownLatch {
    pub fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            condvar: Condvar::new(),
        }
    }

    pub fn count_down(&self) {
        let mut count = self.count.lock();
        if *count == 0 {
            return;
        }
        *count -= 1;
        if *count == 0 {
            self.condvar.notify_all();
        }
    }

    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.condvar.wait(&mut count);
        }
    }

    /// Returns `false` if the timeout elapsed before the latch opened.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let mut count = self.count.lock();
        self.condvar
            .wait_while_for(&mut count, |count| *count > 0, timeout);
        *count == 0
    }

    pub fn count(&self) -> usize {
        *self.count.lock()
    }
}
