//! Accumulating upserts.

use billing_core::{AggregateSink, AggregationTotals, DbErrorCode, Error, ObjectType, Result};
use rusqlite::params;
use tracing::{debug, info};

use crate::client::BillingStore;
use crate::schema::UPSERT_AGGREGATE;

fn write_err(e: rusqlite::Error) -> Error {
    Error::database(DbErrorCode::Write, e.to_string())
}

/// Adds `cost` to the stored total for one object, inserting it if absent.
pub fn upsert_aggregate(
    store: &BillingStore,
    object_type: ObjectType,
    object_id: &str,
    cost: f64,
) -> Result<()> {
    let conn = store.connection();
    conn.prepare_cached(UPSERT_AGGREGATE)
        .and_then(|mut stmt| stmt.execute(params![object_type.as_str(), object_id, cost]))
        .map_err(write_err)?;
    Ok(())
}

/// Upserts every triple of `totals` in a single transaction.
///
/// Either all triples are applied or none are.
pub fn upsert_totals(store: &BillingStore, totals: &AggregationTotals) -> Result<usize> {
    let mut conn = store.connection();
    let tx = conn.transaction().map_err(write_err)?;

    let mut written = 0;
    {
        let mut stmt = tx.prepare_cached(UPSERT_AGGREGATE).map_err(write_err)?;
        for (object_type, object_id, cost) in totals.iter() {
            stmt.execute(params![object_type.as_str(), object_id, cost])
                .map_err(write_err)?;
            written += 1;
        }
    }
    tx.commit().map_err(write_err)?;

    debug!(written, "Committed aggregate upserts");
    Ok(written)
}

impl AggregateSink for BillingStore {
    fn persist(&self, totals: &AggregationTotals) -> Result<usize> {
        let written = upsert_totals(self, totals)?;
        info!(
            written,
            path = %self.config().path.display(),
            "Persisted billing aggregates"
        );
        Ok(written)
    }
}
