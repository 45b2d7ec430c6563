//! Storage subsystem errors.
//!
//! The store converts every one of these into a safe default return value
//! at its public boundary; callers of `metra-store` never see them.

/// An engine-level failure inside the record store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite failure during {operation} on `{table}`: {message}")]
    Sqlite {
        operation: &'static str,
        table: String,
        message: String,
    },

    #[error("insert into `{table}` with no columns")]
    EmptyRow { table: String },

    #[error("invalid identifier `{name}`")]
    InvalidIdentifier { name: String },
}

impl StorageError {
    /// Wrap an engine error message with operation context.
    pub fn sqlite(
        operation: &'static str,
        table: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self::Sqlite {
            operation,
            table: table.into(),
            message: message.to_string(),
        }
    }
}
