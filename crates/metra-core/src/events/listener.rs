//! Listener seams for event dispatch.
//!
//! A host registers either the typed multi-method listener or, when it
//! cannot express that surface, the generic two-channel listener. The
//! shape is fixed once at pipeline construction via [`Listener`] — no
//! runtime type inspection.

use std::sync::Arc;

use serde_json::Value;

use super::types::MeasurementEvent;

/// Typed multi-method listener: one callback per command plus a console
/// sink. All methods default to no-ops.
pub trait MeasurementListener: Send + Sync {
    fn on_started(&self, _event: &MeasurementEvent) {}

    fn on_info(&self, _event: &MeasurementEvent) {}

    fn on_report(&self, _event: &MeasurementEvent) {}

    fn on_finished(&self, _event: &MeasurementEvent) {}

    fn on_error(&self, _event: &MeasurementEvent) {}

    fn on_completed(&self, _event: &MeasurementEvent) {}

    fn on_console_message(&self, _message: &str) {}
}

/// Generic two-channel listener: serialized event payload plus console
/// text, for hosts that cannot express the typed surface.
pub trait GenericListener: Send + Sync {
    fn report_callback(&self, payload: Value);

    fn console_callback(&self, message: &str);
}

/// The listener shape a pipeline dispatches to, chosen at construction.
#[derive(Clone)]
pub enum Listener {
    Typed(Arc<dyn MeasurementListener>),
    Generic(Arc<dyn GenericListener>),
}
