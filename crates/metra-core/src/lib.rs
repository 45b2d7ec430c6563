//! metra-core — types, mapping engine and event pipeline for measurement
//! sessions.
//!
//! The crate is the leaf of the workspace: it knows nothing about how raw
//! telemetry is acquired (that lives behind [`traits::TelemetryProvider`])
//! or how records are persisted (see `metra-store`).

pub mod config;
pub mod errors;
pub mod events;
pub mod logging;
pub mod mapping;
pub mod traits;

pub use config::MetraConfig;
pub use errors::{ConfigError, MappingError, StorageError};
pub use events::pipeline::EventPipeline;
pub use events::types::{Command, MeasurementEvent, TestCase};
pub use mapping::engine::transform;
pub use mapping::spec::MappingSpec;
