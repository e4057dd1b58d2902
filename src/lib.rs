pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod query;
pub mod reports;
pub mod schema;
pub mod server;
pub mod storage;

pub use error::{EtlError, Result};
pub use pipeline::{Pipeline, PipelineResult};
pub use reports::Report;
