//! TableStore — one logical table with an append-only, lazily widened
//! schema.
//!
//! The column set is held as an explicit value on the store and refreshed
//! only by widening writes and explicit probes. All SQL is parameterized;
//! identifiers are validated before being spliced into statements.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use metra_core::errors::StorageError;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};

use crate::connection;
use crate::cursor::RowCursor;
use crate::rows::{read_row, Row};

/// Default row cap for `select_all` when the caller passes 0.
pub const DEFAULT_SELECT_LIMIT: u32 = 10_000;

/// Sort direction for selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Row selector for updates: a surrogate id or an arbitrary filter
/// expression.
#[derive(Debug, Clone)]
pub enum RowPredicate {
    Id(i64),
    Filter(String),
}

struct AttachedDb {
    conn: Connection,
    alias: String,
}

/// A store bound to one (database file, table name) pair.
pub struct TableStore {
    path: PathBuf,
    table: String,
    schema: Mutex<Vec<String>>,
    attached: Mutex<Option<AttachedDb>>,
}

impl TableStore {
    /// Bind a store to a table. The table itself is created on the first
    /// `create_or_widen`; if it already exists its column set is read
    /// into the schema value.
    pub fn open(path: impl Into<PathBuf>, table: &str) -> Result<Self, StorageError> {
        validate_identifier(table)?;
        let store = Self {
            path: path.into(),
            table: table.to_string(),
            schema: Mutex::new(Vec::new()),
            attached: Mutex::new(None),
        };
        if let Ok(columns) = store.introspect() {
            *store.schema_guard() = columns;
        }
        Ok(store)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current schema value: ordered column names, `id` first once
    /// the table exists.
    pub fn schema(&self) -> Vec<String> {
        self.schema_guard().clone()
    }

    /// Create the table if absent (implicit `id` primary column plus one
    /// TEXT column per key) and add any keys not yet present as columns.
    /// Columns are only ever added; existing rows keep empty values in
    /// new columns. Failures are logged and swallowed.
    pub fn create_or_widen(&self, keys: &[&str]) {
        if let Err(error) = self.try_create_or_widen(keys) {
            tracing::warn!(
                operation = "create_or_widen",
                table = %self.table,
                error = %error,
                "schema change failed, schema left unchanged"
            );
        }
    }

    fn try_create_or_widen(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut columns = Vec::with_capacity(keys.len());
        for key in keys {
            // `id` is implicit and never caller-supplied
            if *key == "id" {
                continue;
            }
            validate_identifier(key)?;
            if !columns.contains(key) {
                columns.push(*key);
            }
        }

        let conn = self.connection("create_or_widen")?;

        let mut create = format!(
            "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY AUTOINCREMENT",
            self.table
        );
        for column in &columns {
            create.push_str(", ");
            create.push_str(column);
            create.push_str(" TEXT");
        }
        create.push(')');
        conn.execute_batch(&create).map_err(|e| {
            StorageError::sqlite("create_or_widen", &self.table, format!("{e}; query: {create}"))
        })?;

        let mut existing = introspect_columns(&conn, &self.table)?;
        for column in &columns {
            if !existing.iter().any(|c| c == column) {
                let alter =
                    format!("ALTER TABLE {} ADD COLUMN {} TEXT", self.table, column);
                conn.execute_batch(&alter).map_err(|e| {
                    StorageError::sqlite(
                        "create_or_widen",
                        &self.table,
                        format!("{e}; query: {alter}"),
                    )
                })?;
                existing.push((*column).to_string());
            }
        }

        *self.schema_guard() = existing;
        Ok(())
    }

    /// Insert one row inside a single all-or-nothing transaction. Values
    /// are trimmed of surrounding whitespace before binding. Callers must
    /// have ensured the columns exist via `create_or_widen`; an insert
    /// failure is logged and swallowed (the row is lost, no retry).
    pub fn insert(&self, row: &Row) {
        if let Err(error) = self.try_insert(row) {
            tracing::warn!(
                operation = "insert",
                table = %self.table,
                error = %error,
                "insert failed, row dropped"
            );
        }
    }

    fn try_insert(&self, row: &Row) -> Result<(), StorageError> {
        if row.is_empty() {
            return Err(StorageError::EmptyRow {
                table: self.table.clone(),
            });
        }
        let mut columns = Vec::with_capacity(row.len());
        for column in row.columns() {
            validate_identifier(column)?;
            if column == "id" {
                return Err(StorageError::InvalidIdentifier {
                    name: "id".to_string(),
                });
            }
            columns.push(column);
        }

        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders
        );

        let mut conn = self.connection("insert")?;
        let tx = conn
            .transaction()
            .map_err(|e| StorageError::sqlite("insert", &self.table, e))?;
        {
            let values = row.iter().map(|(_, v)| v.trim());
            tx.execute(&sql, params_from_iter(values)).map_err(|e| {
                StorageError::sqlite("insert", &self.table, format!("{e}; query: {sql}"))
            })?;
        }
        tx.commit()
            .map_err(|e| StorageError::sqlite("insert", &self.table, e))
    }

    /// Update columns on the rows matched by the predicate. Returns the
    /// number of rows affected, 0 on failure.
    pub fn update(&self, values: &Row, predicate: RowPredicate) -> usize {
        match self.try_update(values, &predicate) {
            Ok(count) => count,
            Err(error) => {
                tracing::warn!(
                    operation = "update",
                    table = %self.table,
                    error = %error,
                    "update failed"
                );
                0
            }
        }
    }

    fn try_update(
        &self,
        values: &Row,
        predicate: &RowPredicate,
    ) -> Result<usize, StorageError> {
        if values.is_empty() {
            return Err(StorageError::EmptyRow {
                table: self.table.clone(),
            });
        }
        let mut assignments = Vec::with_capacity(values.len());
        for column in values.columns() {
            validate_identifier(column)?;
            assignments.push(format!("{column} = ?"));
        }

        let mut params: Vec<SqlValue> = values
            .iter()
            .map(|(_, v)| SqlValue::Text(v.to_string()))
            .collect();
        let filter = match predicate {
            RowPredicate::Id(id) => {
                params.push(SqlValue::Integer(*id));
                "id = ?".to_string()
            }
            RowPredicate::Filter(expression) => expression.clone(),
        };

        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            self.table,
            assignments.join(", "),
            filter
        );
        let conn = self.connection("update")?;
        conn.execute(&sql, params_from_iter(params)).map_err(|e| {
            StorageError::sqlite("update", &self.table, format!("{e}; query: {sql}"))
        })
    }

    /// Delete the rows whose column equals the value. An empty or literal
    /// `"0"` value is a no-op guard against accidental full-table deletes
    /// from default values: it returns 0 without touching the engine.
    pub fn delete(&self, column: &str, value: &str) -> usize {
        if value.is_empty() || value == "0" {
            return 0;
        }
        match self.try_delete(column, value) {
            Ok(count) => count,
            Err(error) => {
                tracing::warn!(
                    operation = "delete",
                    table = %self.table,
                    error = %error,
                    "delete failed"
                );
                0
            }
        }
    }

    fn try_delete(&self, column: &str, value: &str) -> Result<usize, StorageError> {
        validate_identifier(column)?;
        let sql = format!("DELETE FROM {} WHERE {} = ?1", self.table, column);
        let conn = self.connection("delete")?;
        conn.execute(&sql, [value]).map_err(|e| {
            StorageError::sqlite("delete", &self.table, format!("{e}; query: {sql}"))
        })
    }

    /// Ordered column names via a 1-row probe; refreshes the schema
    /// value. Empty on failure.
    pub fn select_columns(&self) -> Vec<String> {
        match self.try_select_columns() {
            Ok(columns) => columns,
            Err(error) => {
                tracing::warn!(
                    operation = "select_columns",
                    table = %self.table,
                    error = %error,
                    "column probe failed"
                );
                Vec::new()
            }
        }
    }

    fn try_select_columns(&self) -> Result<Vec<String>, StorageError> {
        let conn = self.connection("select_columns")?;
        let sql = format!("SELECT * FROM {} LIMIT 1", self.table);
        let stmt = conn.prepare(&sql).map_err(|e| {
            StorageError::sqlite("select_columns", &self.table, format!("{e}; query: {sql}"))
        })?;
        let columns: Vec<String> =
            stmt.column_names().iter().map(|c| c.to_string()).collect();
        *self.schema_guard() = columns.clone();
        Ok(columns)
    }

    /// Select all rows matching the filter, ordered by one column. An
    /// empty filter matches everything. Empty list on any failure.
    pub fn select(&self, filter: &str, order: &str, direction: Direction) -> Vec<Row> {
        self.run_select(filter, order, direction, None)
    }

    /// Paginated select; `limit` 0 falls back to 10000.
    pub fn select_all(
        &self,
        filter: &str,
        order: &str,
        direction: Direction,
        limit: u32,
    ) -> Vec<Row> {
        let limit = if limit == 0 { DEFAULT_SELECT_LIMIT } else { limit };
        self.run_select(filter, order, direction, Some(limit))
    }

    fn run_select(
        &self,
        filter: &str,
        order: &str,
        direction: Direction,
        limit: Option<u32>,
    ) -> Vec<Row> {
        match self.try_select(filter, order, direction, limit) {
            Ok(rows) => rows,
            Err(error) => {
                tracing::warn!(
                    operation = "select",
                    table = %self.table,
                    error = %error,
                    "select failed"
                );
                Vec::new()
            }
        }
    }

    fn try_select(
        &self,
        filter: &str,
        order: &str,
        direction: Direction,
        limit: Option<u32>,
    ) -> Result<Vec<Row>, StorageError> {
        validate_identifier(order)?;
        let filter = normalize_filter(filter);
        let mut sql = format!(
            "SELECT * FROM {} WHERE ({}) ORDER BY {} {}",
            self.table,
            filter,
            order,
            direction.sql()
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let conn = self.connection("select")?;
        let mut stmt = conn.prepare(&sql).map_err(|e| {
            StorageError::sqlite("select", &self.table, format!("{e}; query: {sql}"))
        })?;
        let names: Vec<String> =
            stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut rows = stmt
            .query([])
            .map_err(|e| StorageError::sqlite("select", &self.table, e))?;
        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| StorageError::sqlite("select", &self.table, e))?
        {
            out.push(
                read_row(&names, row)
                    .map_err(|e| StorageError::sqlite("select", &self.table, e))?,
            );
        }
        Ok(out)
    }

    /// Lazily-iterated row sequence for streaming large result sets:
    /// finite, single-pass, not restartable. Rows are fetched in keyset
    /// batches on `(order, id)`.
    pub fn select_cursor(
        &self,
        filter: &str,
        order: &str,
        direction: Direction,
    ) -> RowCursor {
        if let Err(error) = validate_identifier(order) {
            tracing::warn!(
                operation = "select_cursor",
                table = %self.table,
                error = %error,
                "invalid order column, cursor is empty"
            );
            return RowCursor::empty();
        }
        RowCursor::new(
            self.path.clone(),
            self.table.clone(),
            normalize_filter(filter),
            order.to_string(),
            direction,
        )
    }

    /// Highest `id` currently present; 0 when the table is empty or on
    /// failure. Ids are assigned strictly increasing and never reused,
    /// even after deletes.
    pub fn last_id(&self) -> i64 {
        match self.try_last_id() {
            Ok(id) => id,
            Err(error) => {
                tracing::warn!(
                    operation = "last_id",
                    table = %self.table,
                    error = %error,
                    "last_id failed"
                );
                0
            }
        }
    }

    fn try_last_id(&self) -> Result<i64, StorageError> {
        let conn = self.connection("last_id")?;
        let sql = format!("SELECT MAX(id) FROM {}", self.table);
        let id: Option<i64> = conn.query_row(&sql, [], |r| r.get(0)).map_err(|e| {
            StorageError::sqlite("last_id", &self.table, format!("{e}; query: {sql}"))
        })?;
        Ok(id.unwrap_or(0))
    }

    /// Distinct coverage markers per session: counts distinct `fkey`
    /// values within rows whose `ftable` equals the group key. The column
    /// names are part of this fixed contract. 0 on failure.
    pub fn distinct_count(&self, group_key: &str) -> i64 {
        match self.try_distinct_count(group_key) {
            Ok(count) => count,
            Err(error) => {
                tracing::warn!(
                    operation = "distinct_count",
                    table = %self.table,
                    error = %error,
                    "distinct_count failed"
                );
                0
            }
        }
    }

    fn try_distinct_count(&self, group_key: &str) -> Result<i64, StorageError> {
        let conn = self.connection("distinct_count")?;
        let sql = format!(
            "SELECT COUNT(1) FROM (SELECT 1 FROM {} WHERE ftable = ?1 GROUP BY fkey)",
            self.table
        );
        conn.query_row(&sql, [group_key], |r| r.get(0)).map_err(|e| {
            StorageError::sqlite("distinct_count", &self.table, format!("{e}; query: {sql}"))
        })
    }

    /// True when the table holds at least one row; false on failure.
    pub fn has_rows(&self) -> bool {
        match self.try_has_rows() {
            Ok(has) => has,
            Err(error) => {
                tracing::warn!(
                    operation = "has_rows",
                    table = %self.table,
                    error = %error,
                    "has_rows failed"
                );
                false
            }
        }
    }

    fn try_has_rows(&self) -> Result<bool, StorageError> {
        let conn = self.connection("has_rows")?;
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {})", self.table);
        let exists: i64 = conn
            .query_row(&sql, [], |r| r.get(0))
            .map_err(|e| StorageError::sqlite("has_rows", &self.table, e))?;
        Ok(exists != 0)
    }

    /// Drop the whole table. Explicit caller operation; failures are
    /// logged and swallowed.
    pub fn drop_table(&self) {
        let sql = format!("DROP TABLE IF EXISTS {}", self.table);
        let result = self
            .connection("drop_table")
            .and_then(|conn| {
                conn.execute_batch(&sql)
                    .map_err(|e| StorageError::sqlite("drop_table", &self.table, e))
            });
        match result {
            Ok(()) => self.schema_guard().clear(),
            Err(error) => {
                tracing::warn!(
                    operation = "drop_table",
                    table = %self.table,
                    error = %error,
                    "drop failed"
                );
            }
        }
    }

    /// Attach another database file under an alias, holding one dedicated
    /// connection until `detach`. Failures are logged and swallowed.
    pub fn attach(&self, db_path: &Path, alias: &str) {
        if let Err(error) = self.try_attach(db_path, alias) {
            tracing::warn!(
                operation = "attach",
                table = %self.table,
                alias = %alias,
                error = %error,
                "attach failed"
            );
        }
    }

    fn try_attach(&self, db_path: &Path, alias: &str) -> Result<(), StorageError> {
        validate_identifier(alias)?;
        let conn = self.connection("attach")?;
        let sql = format!("ATTACH DATABASE ?1 AS {alias}");
        conn.execute(&sql, [db_path.to_string_lossy()])
            .map_err(|e| {
                StorageError::sqlite("attach", &self.table, format!("{e}; query: {sql}"))
            })?;
        *self.attached_guard() = Some(AttachedDb {
            conn,
            alias: alias.to_string(),
        });
        Ok(())
    }

    /// Bulk-copy all rows from one table into another through the engine,
    /// without loading them into the application layer. With an attach in
    /// effect the source is read from the attached database. Returns rows
    /// copied, 0 on failure.
    pub fn copy(&self, from_table: &str, to_table: &str) -> usize {
        match self.try_copy(from_table, to_table) {
            Ok(count) => count,
            Err(error) => {
                tracing::warn!(
                    operation = "copy",
                    table = %self.table,
                    error = %error,
                    "copy failed"
                );
                0
            }
        }
    }

    fn try_copy(&self, from_table: &str, to_table: &str) -> Result<usize, StorageError> {
        validate_identifier(from_table)?;
        validate_identifier(to_table)?;

        let guard = self.attached_guard();
        if let Some(attached) = guard.as_ref() {
            let sql = format!(
                "INSERT INTO {} SELECT * FROM {}.{}",
                to_table, attached.alias, from_table
            );
            return attached.conn.execute(&sql, []).map_err(|e| {
                StorageError::sqlite("copy", &self.table, format!("{e}; query: {sql}"))
            });
        }
        drop(guard);

        let conn = self.connection("copy")?;
        let sql = format!("INSERT INTO {to_table} SELECT * FROM {from_table}");
        conn.execute(&sql, []).map_err(|e| {
            StorageError::sqlite("copy", &self.table, format!("{e}; query: {sql}"))
        })
    }

    /// Release the attached database, if any. A no-op when nothing was
    /// attached.
    pub fn detach(&self) {
        let Some(attached) = self.attached_guard().take() else {
            return;
        };
        let sql = format!("DETACH DATABASE {}", attached.alias);
        if let Err(error) = attached.conn.execute_batch(&sql) {
            tracing::warn!(
                operation = "detach",
                table = %self.table,
                alias = %attached.alias,
                error = %error,
                "detach failed"
            );
        }
    }

    fn connection(&self, operation: &'static str) -> Result<Connection, StorageError> {
        connection::open(&self.path, operation, &self.table)
    }

    fn introspect(&self) -> Result<Vec<String>, StorageError> {
        let conn = self.connection("introspect")?;
        introspect_columns(&conn, &self.table)
    }

    fn schema_guard(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.schema.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn attached_guard(&self) -> std::sync::MutexGuard<'_, Option<AttachedDb>> {
        self.attached.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Ordered column names from `PRAGMA table_info`.
fn introspect_columns(
    conn: &Connection,
    table: &str,
) -> Result<Vec<String>, StorageError> {
    let sql = format!("PRAGMA table_info({table})");
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StorageError::sqlite("introspect", table, e))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| StorageError::sqlite("introspect", table, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StorageError::sqlite("introspect", table, e))?;
    Ok(names)
}

/// Identifiers (table, column, alias names) must be plain: leading alpha
/// or underscore, then alphanumerics/underscores. Everything else is
/// bound as a parameter instead.
pub(crate) fn validate_identifier(name: &str) -> Result<(), StorageError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

pub(crate) fn normalize_filter(filter: &str) -> String {
    if filter.trim().is_empty() {
        "1".to_string()
    } else {
        filter.to_string()
    }
}
