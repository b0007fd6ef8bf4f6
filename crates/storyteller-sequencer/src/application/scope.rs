//! Scoped deferred work.
//!
//! A `TaskScope` owns every timer and background task a page component
//! starts. Closing or dropping the scope aborts them all and flips a liveness
//! flag that deferred effects check before touching page state.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;

/// Shared liveness flag of a scope.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    /// Whether the owning scope is still open.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A set of tasks cancelled together.
#[derive(Debug)]
pub struct TaskScope {
    live: Arc<AtomicBool>,
    tasks: Mutex<JoinSet<()>>,
}

impl TaskScope {
    /// Creates an open scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Returns the scope's liveness flag.
    #[must_use]
    pub fn liveness(&self) -> Liveness {
        Liveness(Arc::clone(&self.live))
    }

    /// Whether the scope has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        !self.live.load(Ordering::Acquire)
    }

    /// Spawns `future` inside the scope. Ignored once the scope is closed.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_closed() {
            return;
        }
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        tasks.spawn(future);
    }

    /// Runs `effect` after `delay`, unless the scope closes first.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn_after<F>(&self, delay: Duration, effect: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let live = self.liveness();
        let deadline = Instant::now() + delay;
        self.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if live.is_live() {
                effect();
            }
        });
    }

    /// Closes the scope, aborting every task it owns.
    pub fn close(&self) {
        self.live.store(false, Ordering::Release);
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();
    }
}

impl Default for TaskScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.close();
    }
}
