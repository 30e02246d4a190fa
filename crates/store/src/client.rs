//! SQLite connection wrapper.

use std::time::Duration;

use billing_core::{DbErrorCode, Error, Result};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, OpenFlags};
use tracing::info;

use crate::config::StoreConfig;

/// Billing store holding a single serialized connection.
pub struct BillingStore {
    conn: Mutex<Connection>,
    config: StoreConfig,
}

impl BillingStore {
    /// Opens (or creates) the database at `config.path`.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let conn = Connection::open_with_flags(&config.path, flags).map_err(|e| {
            Error::database(
                DbErrorCode::Open,
                format!("cannot open {}: {}", config.path.display(), e),
            )
        })?;

        info!(path = %config.path.display(), "Opened billing store");
        Self::configure(conn, config)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::database(DbErrorCode::Open, format!("in-memory open: {}", e)))?;
        Self::configure(conn, StoreConfig::default())
    }

    fn configure(conn: Connection, config: StoreConfig) -> Result<Self> {
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .and_then(|_| conn.execute_batch("PRAGMA foreign_keys = ON;"))
            .map_err(|e| Error::database(DbErrorCode::Open, format!("pragma error: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
            config,
        })
    }

    /// Locks the connection for the duration of the guard.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}
