//! Work that outlives the response.

use std::future::Future;

use futures::future::{join_all, LocalBoxFuture};
use futures::FutureExt;

/// A deferred unit of work.
pub type BackgroundTask = LocalBoxFuture<'static, ()>;

/// Tasks scheduled during request handling.
///
/// Handlers push work here instead of awaiting it; the host sends and closes
/// the response first, then calls [`BackgroundTasks::run_to_completion`].
/// Nothing is polled before that, so a task can never delay the response.
#[derive(Default)]
pub struct BackgroundTasks {
    tasks: Vec<BackgroundTask>,
}

impl BackgroundTasks {
    /// Create an empty task set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a task.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + 'static,
    {
        self.tasks.push(task.boxed_local());
    }

    /// Number of scheduled tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if no task is scheduled.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drive every task to completion, concurrently. Returns how many ran.
    pub async fn run_to_completion(self) -> usize {
        let count = self.tasks.len();
        join_all(self.tasks).await;
        count
    }
}

impl std::fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTasks")
            .field("pending", &self.tasks.len())
            .finish()
    }
}
