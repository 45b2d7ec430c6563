//! Measurement lifecycle events: payload types, listener seams and the
//! synchronous dispatch pipeline.

pub mod listener;
pub mod pipeline;
pub mod types;

pub use listener::{GenericListener, Listener, MeasurementListener};
pub use pipeline::EventPipeline;
pub use types::{Command, MeasurementEvent, TestCase};
