//! Configuration errors.

/// A failure while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read `{path}`: {message}")]
    Io { path: String, message: String },

    #[error("failed to parse `{path}`: {message}")]
    Parse { path: String, message: String },

    #[error("invalid configuration `{field}`: {message}")]
    Validation { field: String, message: String },
}
