//! Catena Runner
//!
//! Pipeline execution for Catena.
//!
//! This crate contains:
//! - Provider traits for model completion, text embedding and vector search,
//!   plus the default HTTP and in-process implementations
//! - Step construction: step definitions resolved into executable steps
//! - The chain executor that runs steps in order over a variable environment

pub mod chain;
pub mod error;
pub mod provider;
pub mod step;

pub use chain::{Chain, ChainLoader, Outputs, convert_text, parse_tag};
pub use error::{ConstructionError, StepError};
