//! Row — one persisted record as an insertion-ordered column→text map.
//!
//! All stored values are text regardless of source type; numeric or
//! boolean callers pre-format to text before insert. On reads the `id`
//! surrogate key comes back as a text column like every other column.

/// Ordered column→value map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value, replacing any existing value for the column
    /// while keeping its original position.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        if let Some(entry) = self.columns.iter_mut().find(|(c, _)| *c == column) {
            entry.1 = value;
        } else {
            self.columns.push((column, value));
        }
    }

    /// Builder-style `set`.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Read a full result row as text, `""` for NULL and blob values.
pub(crate) fn read_row(
    names: &[String],
    source: &rusqlite::Row<'_>,
) -> Result<Row, rusqlite::Error> {
    use rusqlite::types::ValueRef;

    let mut row = Row::new();
    for (index, name) in names.iter().enumerate() {
        let value = match source.get_ref(index)? {
            ValueRef::Null | ValueRef::Blob(_) => String::new(),
            ValueRef::Integer(v) => v.to_string(),
            ValueRef::Real(v) => v.to_string(),
            ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        };
        row.set(name.clone(), value);
    }
    Ok(row)
}
