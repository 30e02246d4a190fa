//! Store health checks and schema bootstrap.

use billing_core::{DbErrorCode, Error, Result};
use rusqlite::params;
use tracing::{debug, info};

use crate::client::BillingStore;
use crate::schema::{
    object_type_seeds, CREATE_BILLING_AGGREGATION, CREATE_OBJECT_TYPES, SEED_OBJECT_TYPE,
};

/// Check if the store answers queries.
pub fn check_connection(store: &BillingStore) -> bool {
    let conn = store.connection();
    match conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)) {
        Ok(_) => true,
        Err(e) => {
            debug!(error = %e, "Store connection check failed");
            false
        }
    }
}

/// Create tables and seed object types. Safe to run on every start.
pub fn init_schema(store: &BillingStore) -> Result<()> {
    let mut conn = store.connection();
    let schema_err = |e: rusqlite::Error| Error::database(DbErrorCode::Schema, e.to_string());

    let tx = conn.transaction().map_err(schema_err)?;
    tx.execute_batch(CREATE_OBJECT_TYPES).map_err(schema_err)?;
    tx.execute_batch(CREATE_BILLING_AGGREGATION)
        .map_err(schema_err)?;
    {
        let mut seed = tx.prepare(SEED_OBJECT_TYPE).map_err(schema_err)?;
        for object_type in object_type_seeds() {
            seed.execute(params![object_type]).map_err(schema_err)?;
        }
    }
    tx.commit().map_err(schema_err)?;

    info!("Billing store schema ready");
    Ok(())
}
