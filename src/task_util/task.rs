/// What the executor does with a task once `run` returns.
pub enum TaskOwnership {
    /// The task hands itself back; the executor drops it.
    TakeOwnership(Box<dyn Task>),
    /// The task moved itself elsewhere (usually back into a runner queue)
    /// and manages its own lifetime from here.
    Retain,
}

impl TaskOwnership {
    pub fn is_retained(&self) -> bool {
        matches!(self, Self::Retain)
    }
}

impl std::fmt::Debug for TaskOwnership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TakeOwnership(_) => f.write_str("TakeOwnership"),
            Self::Retain => f.write_str("Retain"),
        }
    }
}

/// A unit of work posted to a task runner.
pub trait Task: Send + 'static {
    fn run(self: Box<Self>) -> TaskOwnership;
}

struct ClosureTask<F> {
    closure: Option<F>,
}

impl<F> Task for ClosureTask<F>
where
    F: FnOnce() + Send + 'static,
{
    fn run(mut self: Box<Self>) -> TaskOwnership {
        if let Some(closure) = self.closure.take() {
            closure();
        }
        TaskOwnership::TakeOwnership(self)
    }
}

struct ClosureTaskWithCleanup<F, C>
where
    C: FnOnce(),
{
    closure: Option<F>,
    cleanup: Option<C>,
}

impl<F, C> Task for ClosureTaskWithCleanup<F, C>
where
    F: FnOnce() + Send + 'static,
    C: FnOnce() + Send + 'static,
{
    fn run(mut self: Box<Self>) -> TaskOwnership {
        if let Some(closure) = self.closure.take() {
            closure();
        }
        TaskOwnership::TakeOwnership(self)
    }
}

impl<F, C> Drop for ClosureTaskWithCleanup<F, C>
where
    C: FnOnce(),
{
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

/// Wraps a closure into a one-shot [`Task`].
pub fn to_task<F>(closure: F) -> Box<dyn Task>
where
    F: FnOnce() + Send + 'static,
{
    Box::new(ClosureTask {
        closure: Some(closure),
    })
}

/// Like [`to_task`], but `cleanup` runs when the task is destroyed, whether
/// or not the closure ever ran.
pub fn to_task_with_cleanup<F, C>(closure: F, cleanup: C) -> Box<dyn Task>
where
    F: FnOnce() + Send + 'static,
    C: FnOnce() + Send + 'static,
{
    Box::new(ClosureTaskWithCleanup {
        closure: Some(closure),
        cleanup: Some(cleanup),
    })
}
