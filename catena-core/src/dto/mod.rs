//! Data Transfer Objects
//!
//! Request and response shapes exchanged between callers and the Catena
//! orchestrator. DTOs are lightweight views of domain entities.

pub mod job;
pub mod pipeline;
pub mod quota;
