//! Query surface metrics.

use crate::metrics::phase_metric;

pub struct QueryMetrics;

impl QueryMetrics {
    pub fn record_success(rows: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "query", "executed")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "query", "rows_returned")).record(rows as f64);
        ::metrics::histogram!(phase_metric!(histogram, "query", "duration_seconds"))
            .record(duration_secs);
    }

    pub fn record_failure(duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "query", "failed")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "query", "duration_seconds"))
            .record(duration_secs);
    }

    pub(crate) fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "query", "executed"));
        let _ = counter!(phase_metric!(counter, "query", "failed"));
        let _ = histogram!(phase_metric!(histogram, "query", "rows_returned"));
        let _ = histogram!(phase_metric!(histogram, "query", "duration_seconds"));
    }
}
