//! Mapping engine errors.
//!
//! Any of these aborts the remainder of a transform call; output fields
//! written before the failure are kept and returned as-is.

/// A failure while evaluating one mapping rule.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("missing field `{key}` in group `{group}`")]
    MissingField { group: String, key: String },

    #[error("field `{key}` in group `{group}` is not {expected}")]
    TypeMismatch {
        group: String,
        key: String,
        expected: &'static str,
    },

    #[error("group `{group}` aggregates `last` over an empty array")]
    EmptyArray { group: String },

    #[error("invalid rule `{key}` in group `{group}`: {message}")]
    InvalidRule {
        group: String,
        key: String,
        message: String,
    },
}
