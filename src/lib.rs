pub mod aggregate;
pub mod config;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod pipeline;
pub mod server;

pub use aggregate::{aggregate, AggregateRules, AggregateView, FilterState};
pub use error::{IngestError, UnavailableKind};
pub use fetch::{RawTable, TableSource};
pub use ingest::{ingest, IngestRules, Record};
pub use pipeline::Pipeline;

/// Route `tracing` output through the test harness; repeat calls are no-ops.
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
