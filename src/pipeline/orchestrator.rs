use crate::config::PipelineConfig;
use crate::error::Result;
use crate::metrics::PipelineMetrics;
use crate::pipeline::dimensions::{
    build_country_table, build_customer_table, build_product_category_table,
    build_product_table, build_region_table,
};
use crate::pipeline::facts::build_order_detail_table;
use crate::pipeline::PhaseReport;
use crate::storage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument};

type Phase = fn(&Path, &Path) -> Result<PhaseReport>;

/// Phases in dependency order; each one opens and closes its own connection.
const PHASES: [(&str, Phase); 6] = [
    ("region", build_region_table),
    ("country", build_country_table),
    ("customer", build_customer_table),
    ("product category", build_product_category_table),
    ("product", build_product_table),
    ("order detail", build_order_detail_table),
];

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub phases: Vec<PhaseReport>,
    pub duration_secs: f64,
}

impl PipelineResult {
    /// Rows written to `table`, if that phase ran.
    pub fn rows_for(&self, table: &str) -> Option<usize> {
        self.phases.iter().find(|p| p.table == table).map(|p| p.rows)
    }

    pub fn total_rows(&self) -> usize {
        self.phases.iter().map(|p| p.rows).sum()
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    input: PathBuf,
    database: PathBuf,
    reset: bool,
}

impl Pipeline {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(input: P, database: Q) -> Self {
        Self {
            input: input.into(),
            database: database.into(),
            reset: true,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.input_path, &config.database_path).with_reset(config.reset_store)
    }

    /// Whether to delete the store file before the first phase.
    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    /// Run every phase in order. The first failing phase aborts the run.
    #[instrument(skip(self), fields(input = %self.input.display(), database = %self.database.display()))]
    pub fn run(&self) -> Result<PipelineResult> {
        let started = Instant::now();
        info!("Starting normalization pipeline");

        // Create (or wipe) the store up front, then let it go
        drop(storage::connect(&self.database, self.reset)?);

        let mut phases = Vec::with_capacity(PHASES.len());
        for (name, phase) in PHASES {
            debug!("Running {} phase", name);
            let report = phase(&self.input, &self.database)?;
            PipelineMetrics::record_rows_skipped(report.table, report.skipped);
            info!(
                table = report.table,
                rows = report.rows,
                skipped = report.skipped,
                "Phase complete"
            );
            phases.push(report);
        }

        let duration_secs = started.elapsed().as_secs_f64();
        PipelineMetrics::record_run(duration_secs);
        let result = PipelineResult {
            phases,
            duration_secs,
        };
        info!(
            total_rows = result.total_rows(),
            duration_secs, "Pipeline finished"
        );
        Ok(result)
    }
}
