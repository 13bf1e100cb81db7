//! # upr-core
//!
//! Core types shared across all Uproot crates:
//! - Entity structs for migration records (databases, symlinks, modules, steps)
//! - Outcome enums with snake_case serialization
//! - The run context threaded through every workflow (no ambient globals)
//! - The `Prompt` seam that keeps terminal I/O out of library crates
//! - Report rendering for the per-run summary artifact
//! - Timestamped artifact path helpers

pub mod artifacts;
pub mod context;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod prompt;
pub mod report;
