//! metra-store — schema-evolving SQLite table persistence.
//!
//! One [`TableStore`] is bound to one logical table in one database file.
//! Columns are created lazily and only ever added, never removed or
//! renamed; rows carry a store-assigned monotonic `id` surrogate key.
//! Every operation acquires its own scoped connection, and engine-level
//! failures are logged and converted into safe default return values —
//! the store stays usable after any single failure.

pub mod connection;
pub mod cursor;
pub mod rows;
pub mod table;

pub use cursor::RowCursor;
pub use rows::Row;
pub use table::{Direction, RowPredicate, TableStore};
