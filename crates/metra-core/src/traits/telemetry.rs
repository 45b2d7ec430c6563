//! TelemetryProvider — the narrow seam behind which platform acquisition
//! lives. The core only ever consumes the snapshot shape, never the
//! acquisition mechanism.

use serde_json::Value;

pub trait TelemetryProvider: Send + Sync {
    /// The current telemetry snapshot as a nested record (for example a
    /// network/location/system state capture).
    fn snapshot(&self) -> Value;
}
