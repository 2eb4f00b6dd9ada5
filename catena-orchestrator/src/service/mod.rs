//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between repositories, the chain loader and the
//! scheduler.

pub mod catalog;
pub mod job;
pub mod quota;

pub use catalog::JobEmbeddingCatalog;
pub use job::{JobService, ServiceError};
pub use quota::{AdmissionError, QuotaService};
