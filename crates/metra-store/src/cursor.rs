//! RowCursor — lazy, single-pass iteration over a filtered select.
//!
//! Rows are pulled in keyset batches on the composite `(order, id)` key,
//! so each batch opens and releases its own scoped connection and no
//! statement stays live between `next` calls. The sequence is finite and
//! not restartable; rows inserted behind the cursor's position are not
//! revisited.

use std::collections::VecDeque;
use std::path::PathBuf;

use metra_core::errors::StorageError;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, types::ValueRef};

use crate::connection;
use crate::rows::{read_row, Row};
use crate::table::Direction;

const BATCH_SIZE: u32 = 256;

pub struct RowCursor {
    path: PathBuf,
    table: String,
    filter: String,
    order: String,
    direction: Direction,
    batch: VecDeque<Row>,
    /// Keyset position: order value and id of the last yielded row.
    last: Option<(SqlValue, i64)>,
    done: bool,
}

impl RowCursor {
    pub(crate) fn new(
        path: PathBuf,
        table: String,
        filter: String,
        order: String,
        direction: Direction,
    ) -> Self {
        Self {
            path,
            table,
            filter,
            order,
            direction,
            batch: VecDeque::new(),
            last: None,
            done: false,
        }
    }

    /// A cursor that yields nothing, used when the select cannot even be
    /// formed.
    pub(crate) fn empty() -> Self {
        Self {
            path: PathBuf::new(),
            table: String::new(),
            filter: String::new(),
            order: String::new(),
            direction: Direction::Asc,
            batch: VecDeque::new(),
            last: None,
            done: true,
        }
    }

    fn refill(&mut self) {
        match self.try_refill() {
            Ok(()) => {
                if self.batch.is_empty() {
                    self.done = true;
                }
            }
            Err(error) => {
                tracing::warn!(
                    operation = "select_cursor",
                    table = %self.table,
                    error = %error,
                    "batch fetch failed, cursor terminated"
                );
                self.done = true;
            }
        }
    }

    fn try_refill(&mut self) -> Result<(), StorageError> {
        let cmp = match self.direction {
            Direction::Asc => ">",
            Direction::Desc => "<",
        };
        let mut params: Vec<SqlValue> = Vec::new();
        let keyset = match self.last.take() {
            Some((order_value, id)) => {
                params.push(order_value.clone());
                params.push(order_value);
                params.push(SqlValue::Integer(id));
                format!(
                    " AND ({0} {1} ?1 OR ({0} = ?2 AND id {1} ?3))",
                    self.order, cmp
                )
            }
            None => String::new(),
        };
        let sql = format!(
            "SELECT * FROM {} WHERE ({}){} ORDER BY {} {}, id {} LIMIT {}",
            self.table,
            self.filter,
            keyset,
            self.order,
            self.direction.sql(),
            self.direction.sql(),
            BATCH_SIZE
        );

        let conn = connection::open(&self.path, "select_cursor", &self.table)?;
        let mut stmt = conn.prepare(&sql).map_err(|e| {
            StorageError::sqlite("select_cursor", &self.table, format!("{e}; query: {sql}"))
        })?;
        let names: Vec<String> =
            stmt.column_names().iter().map(|c| c.to_string()).collect();
        let order_index = names.iter().position(|n| *n == self.order);
        let id_index = names.iter().position(|n| n == "id");

        let mut rows = stmt
            .query(params_from_iter(params))
            .map_err(|e| StorageError::sqlite("select_cursor", &self.table, e))?;
        while let Some(source) = rows
            .next()
            .map_err(|e| StorageError::sqlite("select_cursor", &self.table, e))?
        {
            if let (Some(order_index), Some(id_index)) = (order_index, id_index) {
                let order_value = owned_value(source.get_ref(order_index).map_err(|e| {
                    StorageError::sqlite("select_cursor", &self.table, e)
                })?);
                let id: i64 = source.get(id_index).map_err(|e| {
                    StorageError::sqlite("select_cursor", &self.table, e)
                })?;
                self.last = Some((order_value, id));
            }
            self.batch.push_back(
                read_row(&names, source)
                    .map_err(|e| StorageError::sqlite("select_cursor", &self.table, e))?,
            );
        }

        // A table without an id column cannot advance the keyset; stop
        // after one batch rather than loop on the same rows.
        if self.last.is_none() {
            self.done = true;
        }
        Ok(())
    }
}

impl Iterator for RowCursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if self.batch.is_empty() && !self.done {
            self.refill();
        }
        self.batch.pop_front()
    }
}

fn owned_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(v) => SqlValue::Integer(v),
        ValueRef::Real(v) => SqlValue::Real(v),
        ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
    }
}
