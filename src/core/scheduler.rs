//! # Shared background scheduler.
//!
//! One [`Scheduler`] is shared by many supervisors. It runs retry loops, probes and
//! notification deliveries so no caller ever waits on supervisor internals.
//!
//! ## Model
//! ```text
//! spawn(fut)  ─► tokio task, cancelled when the scheduler shuts down
//!                  (cheap: sleeping retry loops hold no worker)
//!
//! run(work)   ─► acquire worker permit ─► work ─► release
//!                  (bounded: at most `workers` units of work at once)
//! ```
//!
//! Retry loops call `run` around each attempt only, so a loop sleeping through a
//! two-minute backoff does not occupy a worker.

use std::future::Future;
use std::sync::Arc;

use tokio::{select, sync::Semaphore, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Bounded pool for background work.
#[derive(Debug)]
pub struct Scheduler {
    permits: Option<Arc<Semaphore>>,
    workers: Option<usize>,
    token: CancellationToken,
}

impl Scheduler {
    /// Creates a scheduler running at most `workers` units of work concurrently
    /// (`None` = unlimited).
    pub fn new(workers: Option<usize>) -> Arc<Self> {
        let workers = workers.map(|n| n.max(1));
        Arc::new(Self {
            permits: workers.map(Semaphore::new).map(Arc::new),
            workers,
            token: CancellationToken::new(),
        })
    }

    /// Worker limit (`None` = unlimited).
    pub fn workers(&self) -> Option<usize> {
        self.workers
    }

    /// Currently idle workers (`None` = unlimited).
    pub fn idle_workers(&self) -> Option<usize> {
        self.permits.as_ref().map(|s| s.available_permits())
    }

    /// A token cancelled when the scheduler shuts down.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Spawns a background task; it is dropped at its next await point after
    /// [`shutdown`](Self::shutdown).
    ///
    /// Must be called within a Tokio runtime.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        tokio::spawn(async move {
            select! {
                _ = fut => {}
                _ = token.cancelled() => {}
            }
        })
    }

    /// Runs `work` on one worker, waiting for a free one first.
    ///
    /// Returns `None` if the scheduler shut down before or while `work` ran.
    pub async fn run<F: Future>(&self, work: F) -> Option<F::Output> {
        let _permit = match &self.permits {
            Some(sem) => select! {
                permit = Arc::clone(sem).acquire_owned() => Some(permit.ok()?),
                _ = self.token.cancelled() => return None,
            },
            None => None,
        };
        select! {
            out = work => Some(out),
            _ = self.token.cancelled() => None,
        }
    }

    /// Cancels every spawned task and refuses further work.
    pub fn shutdown(&self) {
        self.token.cancel();
        if let Some(sem) = &self.permits {
            sem.close();
        }
    }

    /// Whether [`shutdown`](Self::shutdown) was called.
    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }
}
