//! Named OS thread with a scheduling priority and synchronous start.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::thread::{self, JoinHandle};

use tracing::{trace, warn};

use crate::count_down_latch::CountDownLatch;
use crate::error::{BaseError, Result};

/// Nice-style scheduling priority. Lower values run more eagerly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadPriority(i32);

impl ThreadPriority {
    pub const LOWEST: Self = Self(19);
    /// Background work.
    pub const BACKGROUND: Self = Self(10);
    pub const NORMAL: Self = Self(0);
    pub const VIDEO: Self = Self(-10);
    pub const AUDIO: Self = Self(-16);
    /// Regular processes are usually refused this level.
    pub const HIGHEST: Self = Self(-20);
    pub const DEFAULT: Self = Self::NORMAL;

    pub const fn new(nice: i32) -> Self {
        Self(nice)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl Default for ThreadPriority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

pub type ThreadFunc = Box<dyn FnOnce() + Send + 'static>;

pub struct Thread {
    name: String,
    priority: ThreadPriority,
    joinable: bool,
    func: Option<ThreadFunc>,
    handle: Option<JoinHandle<()>>,
    started: bool,
    tid: Arc<AtomicI32>,
    latch: Arc<CountDownLatch>,
}

impl Thread {
    pub fn new<F>(func: F, name: impl Into<String>, priority: ThreadPriority) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::with_joinable(func, name, priority, true)
    }

    /// A non-joinable thread is detached as soon as it starts.
    pub fn with_joinable<F>(
        func: F,
        name: impl Into<String>,
        priority: ThreadPriority,
        joinable: bool,
    ) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            name: name.into(),
            priority,
            joinable,
            func: Some(Box::new(func)),
            handle: None,
            started: false,
            tid: Arc::new(AtomicI32::new(0)),
            latch: Arc::new(CountDownLatch::new(1)),
        }
    }
}

impl Thread {
    /// Spawns the thread. Unless `async_start` is set, blocks until the new
    /// thread is running and has recorded its OS thread id.
    ///
    /// The closure is consumed when spawning fails, but kept when the name
    /// is rejected.
    pub fn start(&mut self, async_start: bool) -> Result<()> {
        if self.started {
            return Err(BaseError::ThreadAlreadyStarted(self.name.clone()));
        }
        if self.name.contains('\0') {
            return Err(BaseError::InvalidThreadName(self.name.clone()));
        }
        let Some(func) = self.func.take() else {
            return Err(BaseError::ThreadAlreadyStarted(self.name.clone()));
        };

        let thread_name = if self.name.is_empty() {
            "thread".to_string()
        } else {
            self.name.clone()
        };
        let tid = Arc::clone(&self.tid);
        let latch = Arc::clone(&self.latch);
        let priority = self.priority;
        let log_name = thread_name.clone();

        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                tid.store(current_tid(), Ordering::Release);
                latch.count_down();
                apply_priority(priority, &log_name);
                func();
            })
            .map_err(|source| BaseError::ThreadSpawn {
                name: self.name.clone(),
                source,
            })?;

        self.started = true;
        if self.joinable {
            self.handle = Some(handle);
        }

        if !async_start {
            self.latch.wait();
        }
        Ok(())
    }

    pub fn join(&mut self) -> Result<()> {
        if !self.started {
            return Err(BaseError::ThreadNotStarted(self.name.clone()));
        }
        let handle = self
            .handle
            .take()
            .ok_or_else(|| BaseError::ThreadAlreadyJoined(self.name.clone()))?;
        handle.join().map_err(|payload| BaseError::ThreadPanicked {
            name: self.name.clone(),
            message: panic_message(payload.as_ref()),
        })
    }

    /// Lets the thread run on without anyone joining it.
    pub fn detach(&mut self) {
        self.handle = None;
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn joinable(&self) -> bool {
        self.handle.is_some()
    }

    /// OS thread id, once the thread has begun running.
    pub fn tid(&self) -> Option<i32> {
        match self.tid.load(Ordering::Acquire) {
            0 => None,
            tid => Some(tid),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> ThreadPriority {
        self.priority
    }
}

impl std::fmt::Debug for Thread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thread")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("started", &self.started)
            .field("tid", &self.tid())
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(target_os = "linux")]
fn current_tid() -> i32 {
    // SAFETY: gettid takes no arguments and cannot fail.
    unsafe { libc::syscall(libc::SYS_gettid) as i32 }
}

#[cfg(not(target_os = "linux"))]
fn current_tid() -> i32 {
    -1
}

#[cfg(target_os = "linux")]
fn apply_priority(priority: ThreadPriority, name: &str) {
    let tid = current_tid();
    // SAFETY: plain syscall on our own tid with an integer priority.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, tid as libc::id_t, priority.raw()) };
    if rc == 0 {
        trace!(thread = name, priority = priority.raw(), "applied thread priority");
    } else {
        warn!(
            thread = name,
            priority = priority.raw(),
            error = %std::io::Error::last_os_error(),
            "thread priority refused, keeping inherited priority"
        );
    }
}

#[cfg(not(target_os = "linux"))]
fn apply_priority(priority: ThreadPriority, name: &str) {
    trace!(thread = name, priority = priority.raw(), "thread priorities unsupported on this platform");
}
