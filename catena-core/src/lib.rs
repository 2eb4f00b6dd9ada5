//! Catena Core
//!
//! Core types and pure building blocks for the Catena pipeline system.
//!
//! This crate contains:
//! - Domain types: steps, jobs, quota ledgers, provider credentials and parameters
//! - DTOs: request/response shapes exchanged with the orchestrator surface
//! - Template resolution, tag extraction and document chunking (no I/O)

pub mod chunker;
pub mod domain;
pub mod dto;
pub mod tag;
pub mod template;

pub use template::{Resolved, Variables, resolve};
