//! Scheduler layer
//!
//! Runs accepted jobs in the background. Each job gets one task gated by the
//! worker pool's semaphore, an explicit `JobContext` and a cancellation token
//! registered under its id for as long as the worker is alive.

pub mod batch;
pub mod context;
pub mod embedding;
pub mod pool;
pub mod registry;

pub use batch::{BatchJob, run_batch};
pub use context::JobContext;
pub use embedding::{EmbeddingJob, run_embedding};
pub use pool::WorkerPool;
pub use registry::CancellationRegistry;
