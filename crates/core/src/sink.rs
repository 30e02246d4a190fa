//! Destination for a run's final totals.

use crate::error::Result;
use crate::totals::AggregationTotals;

/// Durable store that accumulates totals.
///
/// `persist` adds each `(object_type, object_id, cost)` triple to whatever is
/// already stored for that key and inserts missing keys. Implementations
/// apply one call atomically.
pub trait AggregateSink: Send + Sync {
    /// Returns the number of triples written.
    fn persist(&self, totals: &AggregationTotals) -> Result<usize>;
}
