//! Connection handling: one write connection behind a mutex, WAL mode.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use narra_core::errors::{StoreError, StoreResult};

use crate::to_store_err;

/// Shared handle to the single SQLite connection. All stores clone this;
/// the mutex serialises writers and keeps read-modify-write cycles atomic
/// with respect to each other.
#[derive(Clone)]
pub struct StorePool {
    conn: Arc<Mutex<Connection>>,
}

impl StorePool {
    /// Opens (or creates) the database file, applies pragmas and runs
    /// migrations.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(to_store_err)?;
        Self::configure(conn)
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(to_store_err)?;
        Self::configure(conn)
    }

    fn configure(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(to_store_err)?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(to_store_err)?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(to_store_err)?;
        crate::migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs a closure against the connection under the store lock.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let guard = self.conn.lock().map_err(|_| StoreError::Sqlite {
            message: "store mutex poisoned".to_string(),
        })?;
        f(&guard)
    }
}
