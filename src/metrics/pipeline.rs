//! Pipeline phase metrics: table rebuilds, inserted rows, skipped rows.

use crate::metrics::phase_metric;

pub struct PipelineMetrics;

impl PipelineMetrics {
    /// Record a committed table rebuild
    pub fn record_table_rebuilt(table: &'static str, rows: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "pipeline", "tables_rebuilt"), "table" => table)
            .increment(1);
        ::metrics::counter!(phase_metric!(counter, "pipeline", "rows_inserted"), "table" => table)
            .increment(rows as u64);
        ::metrics::histogram!(phase_metric!(histogram, "pipeline", "phase_duration_seconds"), "table" => table)
            .record(duration_secs);
    }

    /// Rows a builder ignored because they had too few fields
    pub fn record_rows_skipped(table: &'static str, count: usize) {
        if count == 0 {
            return;
        }
        ::metrics::counter!(phase_metric!(counter, "pipeline", "rows_skipped"), "table" => table)
            .increment(count as u64);
    }

    /// Rows whose parallel lists had different lengths
    pub fn record_misaligned_rows(count: usize) {
        if count == 0 {
            return;
        }
        ::metrics::counter!(phase_metric!(counter, "pipeline", "misaligned_rows"))
            .increment(count as u64);
    }

    /// Fail-soft storage faults during drop/create
    pub fn record_storage_fault(table: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "pipeline", "storage_faults"), "table" => table)
            .increment(1);
    }

    pub fn record_run(duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "pipeline", "runs")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "pipeline", "run_duration_seconds"))
            .record(duration_secs);
    }

    pub(crate) fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "pipeline", "runs"));
        let _ = counter!(phase_metric!(counter, "pipeline", "misaligned_rows"));
        let _ = histogram!(phase_metric!(histogram, "pipeline", "run_duration_seconds"));
    }
}
