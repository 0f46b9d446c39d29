//! Bounded worker pool for page tasks
//!
//! Every page task is spawned up front; a task must hold a permit from the
//! pool's semaphore while it fetches and extracts, so at most `size` pages are
//! in flight at once.

use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Resolves the configured worker count; 0 means the available parallelism
pub fn resolve_worker_count(configured: u32) -> usize {
    if configured > 0 {
        return configured as usize;
    }
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}

/// Semaphore-backed concurrency limit shared by the page tasks of one run
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Creates a pool for `configured` workers (0 = available parallelism)
    pub fn new(configured: u32) -> Self {
        let size = resolve_worker_count(configured);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Waits for a free worker slot
    ///
    /// Returns None only if the pool has been closed.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.semaphore.clone().acquire_owned().await.ok()
    }

    /// Slots not currently held by a task
    #[cfg(test)]
    fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
