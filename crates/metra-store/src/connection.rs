//! Scoped connection acquisition with pragma application.
//!
//! Each store operation opens its own connection and releases it on every
//! exit path; the engine serializes overlapping writers via its own
//! locking plus the busy timeout below.

use std::path::Path;

use metra_core::errors::StorageError;
use rusqlite::Connection;

/// Open a connection to the database file with the standard pragmas.
pub(crate) fn open(
    path: &Path,
    operation: &'static str,
    table: &str,
) -> Result<Connection, StorageError> {
    let conn =
        Connection::open(path).map_err(|e| StorageError::sqlite(operation, table, e))?;
    apply_pragmas(&conn).map_err(|e| StorageError::sqlite(operation, table, e))?;
    Ok(conn)
}

fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA foreign_keys = ON;",
    )
}
