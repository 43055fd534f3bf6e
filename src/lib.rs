// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod ingest;
pub mod insight;
pub mod ledger;
pub mod metrics;
pub mod pipeline;
pub mod publish;

// ---- Re-exports for stable public API ----
pub use crate::insight::ai_adapter;
pub use crate::pipeline::{Pipeline, RunOutcome};
