//! Internal telemetry for the billing aggregator: structured logging setup
//! and in-process pipeline counters.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::*;
pub use tracing_setup::*;
