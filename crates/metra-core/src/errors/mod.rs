//! Error handling for Metra.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod config_error;
pub mod mapping_error;
pub mod storage_error;

pub use config_error::ConfigError;
pub use mapping_error::MappingError;
pub use storage_error::StorageError;
