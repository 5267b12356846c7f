//! Test module for scenario and concurrency tests.
//!
//! - `scenarios.rs`: end-to-end signal sequences against a real town map
//! - `concurrency.rs`: parallel and interleaved signals across towns
//! - `helpers.rs`: world setup and collaborator doubles

mod concurrency;
mod helpers;

// Re-export for convenience
pub use helpers::*;
