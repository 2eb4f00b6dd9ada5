//! Worker pool
//!
//! Bounds the number of jobs executing at once. Spawned jobs that cannot get
//! a permit wait (in QUEUED) until a running job finishes.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use uuid::Uuid;

#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_workers)),
        }
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Spawns `work` for `job_id` once a permit is free
    pub fn spawn<F>(&self, job_id: Uuid, work: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("Worker pool closed before job {} could start: {}", job_id, e);
                    return;
                }
            };

            debug!("Worker started for job {}", job_id);
            work.await;
            debug!("Worker finished for job {}", job_id);
            // Permit is automatically released when dropped
        })
    }
}
