//! Capability traits at the crate seams.

pub mod result_info;
pub mod telemetry;

pub use result_info::ResultInfo;
pub use telemetry::TelemetryProvider;
