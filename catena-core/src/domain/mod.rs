//! Core domain types
//!
//! These types represent the fundamental entities of the system and are shared
//! between the orchestrator (persistence, admission) and the runner (execution).

pub mod credentials;
pub mod job;
pub mod params;
pub mod quota;
pub mod step;
