//! Metrics for the ETL phases and the query surface.
//!
//! Each area defines its own metrics in a dedicated submodule. Names follow
//! `etl_{phase}_{metric}` with a `_total` suffix on counters.

pub mod pipeline;
pub mod query;

pub use pipeline::PipelineMetrics;
pub use query::QueryMetrics;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder and pre-register every metric.
///
/// Idempotent. Without this call the metric macros are no-ops, which is what
/// the batch CLI and the tests rely on.
pub fn init_metrics() {
    INIT.call_once(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_err() {
                warn!("Prometheus handle was already stored");
            }
            PipelineMetrics::register_metrics();
            QueryMetrics::register_metrics();
            info!("Prometheus recorder installed");
        }
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
        }
    });
}

/// Render the current snapshot in Prometheus text format.
pub fn render() -> Option<String> {
    HANDLE.get().map(|h| h.render())
}

/// Builds a metric name following `etl_{phase}_{name}`; counters get `_total`.
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("etl_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("etl_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;

#[cfg(test)]
mod tests {
    #[test]
    fn test_phase_metric_names() {
        assert_eq!(
            phase_metric!(counter, "pipeline", "rows_inserted"),
            "etl_pipeline_rows_inserted_total"
        );
        assert_eq!(
            phase_metric!(histogram, "query", "duration_seconds"),
            "etl_query_duration_seconds"
        );
    }
}
