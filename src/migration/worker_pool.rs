//! # Worker Pool
//!
//! Bounded concurrency for record pipelines.
//!
//! ```text
//! driver ──submit──▶ [Semaphore: K permits] ──spawn──▶ task body ──drop(permit)
//!    │                                                     │
//!    └──────────────drain──▶ [JoinSet] ◀───────────────────┘
//! ```
//!
//! `submit` waits for a permit, then spawns the body on the runtime with the
//! permit moved inside it. The permit is an owned RAII guard, so the slot is
//! returned on every exit path of the body, including a panic. `drain` is the
//! join barrier for however many tasks were submitted during the run.
//! `abort` cancels whatever is still running and closes the pool.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, warn};

use crate::error::MigrationError;

/// Fixed-capacity pool of concurrently executing tasks
pub struct WorkerPool {
    pool_id: String,
    capacity: usize,
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<Result<(), String>>,
    submitted: u64,
    completed: u64,
    panicked: u64,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("pool_id", &self.pool_id)
            .field("capacity", &self.capacity)
            .field("in_flight", &self.in_flight())
            .field("submitted", &self.submitted)
            .field("completed", &self.completed)
            .finish()
    }
}

impl WorkerPool {
    /// Create a pool with `capacity` slots. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self::with_id(capacity, "record-pipeline")
    }

    pub fn with_id(capacity: usize, pool_id: impl Into<String>) -> Self {
        let capacity = capacity.max(1);
        Self {
            pool_id: pool_id.into(),
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
            tasks: JoinSet::new(),
            submitted: 0,
            completed: 0,
            panicked: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held by running task bodies
    pub fn in_flight(&self) -> usize {
        self.capacity
            .saturating_sub(self.semaphore.available_permits())
    }

    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// Tasks observed finished so far, panicked ones included
    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn panicked(&self) -> u64 {
        self.panicked
    }

    /// Wait for a free slot, then start `task` on the runtime
    ///
    /// Returns as soon as the task has been spawned; it does not wait for the
    /// task to finish.
    pub async fn submit<F>(&mut self, task: F) -> Result<(), MigrationError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.reap_finished();

        if self.semaphore.available_permits() == 0 {
            debug!(
                pool_id = %self.pool_id,
                capacity = self.capacity,
                "Worker pool saturated, waiting for a free slot"
            );
        }

        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| MigrationError::WorkerPool("pool has been aborted".to_string()))?;

        self.tasks.spawn(async move {
            let _permit = permit;
            AssertUnwindSafe(task)
                .catch_unwind()
                .await
                .map_err(|panic| panic_message(panic.as_ref()))
        });
        self.submitted += 1;

        Ok(())
    }

    /// Block until every submitted task has finished
    ///
    /// Returns the total number of tasks completed over the pool's lifetime.
    pub async fn drain(&mut self) -> u64 {
        debug!(
            pool_id = %self.pool_id,
            outstanding = self.tasks.len(),
            "Draining worker pool"
        );

        while let Some(result) = self.tasks.join_next().await {
            self.observe(result);
        }

        self.completed
    }

    /// Cancel every outstanding task without waiting for it and refuse
    /// further submissions
    ///
    /// Returns the number of tasks that were still outstanding.
    pub fn abort(&mut self) -> usize {
        self.reap_finished();
        let outstanding = self.tasks.len();
        self.semaphore.close();
        self.tasks.abort_all();
        self.tasks.detach_all();

        if outstanding > 0 {
            warn!(
                pool_id = %self.pool_id,
                outstanding = outstanding,
                "Worker pool aborted with tasks in flight"
            );
        }
        outstanding
    }

    /// Collect already-finished tasks so their handles do not accumulate
    fn reap_finished(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            self.observe(result);
        }
    }

    fn observe(&mut self, result: Result<Result<(), String>, JoinError>) {
        self.completed += 1;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(panic_msg)) => {
                self.panicked += 1;
                error!(
                    pool_id = %self.pool_id,
                    panic_msg = %panic_msg,
                    "Worker task panicked"
                );
            }
            Err(join_error) => {
                warn!(
                    pool_id = %self.pool_id,
                    error = %join_error,
                    "Worker task did not run to completion"
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
