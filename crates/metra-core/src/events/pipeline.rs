//! EventPipeline — synchronous lifecycle dispatch on the calling thread.
//!
//! The pipeline holds the current mutable event and the listener it was
//! constructed with. It enforces no ordering between commands: ordering
//! discipline is a caller convention. No queuing, no retry, no duplicate
//! suppression.

use serde_json::Value;

use super::listener::Listener;
use super::types::{Command, MeasurementEvent, TestCase};
use crate::traits::result_info::ResultInfo;
use crate::traits::telemetry::TelemetryProvider;

const DEFAULT_REPORT_MESSAGE: &str = "measurement report";
const COMPLETED_MESSAGE: &str = "all measurements completed";
const DEFAULT_ERROR_MESSAGE: &str = "error";

pub struct EventPipeline {
    listener: Listener,
    event: MeasurementEvent,
}

impl EventPipeline {
    pub fn new(listener: Listener) -> Self {
        Self {
            listener,
            event: MeasurementEvent::new(),
        }
    }

    /// The current event state (immutable once dispatched; the pipeline
    /// reuses it for the next transition).
    pub fn event(&self) -> &MeasurementEvent {
        &self.event
    }

    pub fn create_start_message(&mut self, test_case: TestCase, message: &str) {
        self.event.command = Command::Started;
        self.event.test_case = Some(test_case);
        self.event.message = message.to_string();
        self.dispatch();
    }

    pub fn create_info_message(&mut self, test_case: TestCase, message: &str) {
        self.event.command = Command::Info;
        self.event.test_case = Some(test_case);
        self.event.message = message.to_string();
        self.dispatch();
    }

    pub fn create_finish_message(&mut self, test_case: TestCase, message: &str) {
        self.event.command = Command::Finish;
        self.event.test_case = Some(test_case);
        self.event.message = message.to_string();
        self.dispatch();
    }

    /// Report dispatch. Appends `result` to the accumulated results, so a
    /// Report event always carries a non-empty payload and a test case.
    /// The message defaults to "measurement report" when none is supplied.
    pub fn create_report_message(
        &mut self,
        test_case: TestCase,
        result: &dyn ResultInfo,
        message: Option<&str>,
    ) {
        self.event.command = Command::Report;
        self.event.test_case = Some(test_case);
        self.event.results.push(result.to_record());
        self.event.message = message.unwrap_or(DEFAULT_REPORT_MESSAGE).to_string();
        self.dispatch();
    }

    pub fn create_completed_message(&mut self) {
        self.event.command = Command::Completed;
        self.event.message = COMPLETED_MESSAGE.to_string();
        self.dispatch();
    }

    /// Error dispatch. The message defaults to "error" when the caller
    /// supplies none (or an empty one); an Error event never carries an
    /// empty message.
    pub fn create_error_message(&mut self, message: Option<&str>) {
        self.event.command = Command::Error;
        self.event.message = match message {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => DEFAULT_ERROR_MESSAGE.to_string(),
        };
        self.dispatch();
    }

    /// Generic ingestion entry point: appends the raw sample to the
    /// accumulated results, then routes on the *current* command —
    /// Error, Completed and Started re-run their specialized constructor
    /// from the event's already-set fields; everything else dispatches
    /// directly.
    pub fn create_message(&mut self, sample: Value) {
        self.event.results.push(sample);
        match self.event.command {
            Command::Error => {
                if self.event.message.is_empty() {
                    self.event.message = DEFAULT_ERROR_MESSAGE.to_string();
                }
                self.dispatch();
            }
            Command::Completed => self.create_completed_message(),
            Command::Started => self.dispatch(),
            _ => self.dispatch(),
        }
    }

    /// Append a provider snapshot to the accumulated results without
    /// dispatching. Used to fold ambient telemetry into the next event.
    pub fn append_snapshot(&mut self, provider: &dyn TelemetryProvider) {
        self.event.results.push(provider.snapshot());
    }

    fn dispatch(&self) {
        let console = self.event.console_line();
        tracing::debug!(command = %self.event.command, "dispatching measurement event");
        match &self.listener {
            Listener::Typed(listener) => {
                match self.event.command {
                    Command::Started => listener.on_started(&self.event),
                    Command::Info => listener.on_info(&self.event),
                    Command::Report => listener.on_report(&self.event),
                    Command::Finish => listener.on_finished(&self.event),
                    Command::Completed => listener.on_completed(&self.event),
                    Command::Error => listener.on_error(&self.event),
                }
                listener.on_console_message(&console);
            }
            Listener::Generic(listener) => {
                listener.report_callback(self.event.to_json());
                listener.console_callback(&console);
            }
        }
    }
}
