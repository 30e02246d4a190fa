//! Mock implementations for testing.

use std::sync::Arc;

use billing_core::{AggregateSink, AggregationTotals, DbErrorCode, Error, Result};
use parking_lot::Mutex;

/// Sink that captures persisted totals in memory.
#[derive(Clone, Default)]
pub struct MockSink {
    calls: Arc<Mutex<Vec<AggregationTotals>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every set of totals handed to `persist`.
    pub fn captured(&self) -> Vec<AggregationTotals> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Set failure mode for testing error handling.
    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }
}

impl AggregateSink for MockSink {
    fn persist(&self, totals: &AggregationTotals) -> Result<usize> {
        if *self.should_fail.lock() {
            return Err(Error::database(DbErrorCode::Write, "mock write failure"));
        }
        self.calls.lock().push(totals.clone());
        Ok(totals.len())
    }
}
