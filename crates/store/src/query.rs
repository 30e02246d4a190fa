//! Read helpers for stored aggregates (used in tests and reporting).

use billing_core::{DbErrorCode, Error, ObjectType, Result};
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use crate::client::BillingStore;

/// A stored cumulative total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub object_type: ObjectType,
    pub object_id: String,
    pub cost: f64,
}

fn query_err(e: rusqlite::Error) -> Error {
    Error::database(DbErrorCode::Query, e.to_string())
}

/// Stored total for one object, if any.
pub fn aggregate_cost(
    store: &BillingStore,
    object_type: ObjectType,
    object_id: &str,
) -> Result<Option<f64>> {
    let conn = store.connection();
    conn.query_row(
        "SELECT cost FROM billing_aggregation WHERE object_type = ?1 AND object_id = ?2",
        params![object_type.as_str(), object_id],
        |row| row.get(0),
    )
    .optional()
    .map_err(query_err)
}

/// All stored totals of one level, ordered by id.
pub fn list_aggregates(store: &BillingStore, object_type: ObjectType) -> Result<Vec<AggregateRow>> {
    let conn = store.connection();
    let mut stmt = conn
        .prepare_cached(
            "SELECT object_id, cost FROM billing_aggregation \
             WHERE object_type = ?1 ORDER BY object_id",
        )
        .map_err(query_err)?;

    let rows = stmt
        .query_map(params![object_type.as_str()], |row| {
            Ok(AggregateRow {
                object_type,
                object_id: row.get(0)?,
                cost: row.get(1)?,
            })
        })
        .map_err(query_err)?;

    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(query_err)
}

/// Seeded object types as `(id, name)`.
pub fn object_types(store: &BillingStore) -> Result<Vec<(i64, String)>> {
    let conn = store.connection();
    let mut stmt = conn
        .prepare("SELECT id, object_type FROM object_types ORDER BY id")
        .map_err(query_err)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(query_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(query_err)
}
