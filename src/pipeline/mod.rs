// Normalization pipeline: dimensions, lookups, facts, and the orchestrator

pub mod dimensions;
pub mod facts;
pub mod lookups;
pub mod orchestrator;

pub use orchestrator::{Pipeline, PipelineResult};

use serde::Serialize;

/// Outcome of one table rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub table: &'static str,
    pub rows: usize,
    /// Rows with too few fields for this builder
    pub skipped: usize,
    /// Rows whose order lists were truncated (fact table only)
    pub misaligned: usize,
}

impl PhaseReport {
    pub fn new(table: &'static str, rows: usize, skipped: usize) -> Self {
        Self {
            table,
            rows,
            skipped,
            misaligned: 0,
        }
    }

    pub fn with_misaligned(mut self, misaligned: usize) -> Self {
        self.misaligned = misaligned;
        self
    }
}
