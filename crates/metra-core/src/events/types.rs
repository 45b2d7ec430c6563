//! Event payload types for the measurement lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle phase of a measurement event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Started,
    Info,
    Report,
    Finish,
    Completed,
    Error,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Started => "STARTED",
            Self::Info => "INFO",
            Self::Report => "REPORT",
            Self::Finish => "FINISH",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// The phase of a measurement session an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCase {
    Ip,
    Init,
    RttUdp,
    Download,
    Upload,
    TraceRoute,
    End,
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ip => "IP",
            Self::Init => "INIT",
            Self::RttUdp => "RTT_UDP",
            Self::Download => "DOWNLOAD",
            Self::Upload => "UPLOAD",
            Self::TraceRoute => "TRACE_ROUTE",
            Self::End => "END",
        };
        f.write_str(name)
    }
}

/// One lifecycle notification.
///
/// `test_case` is absent for events that are not bound to a phase
/// (`Error`, `Completed`); `results` is populated only for `Report` and
/// for raw samples appended via the generic ingestion path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementEvent {
    #[serde(rename = "cmd")]
    pub command: Command,
    pub test_case: Option<TestCase>,
    #[serde(rename = "msg")]
    pub message: String,
    pub results: Vec<Value>,
}

impl MeasurementEvent {
    pub fn new() -> Self {
        Self {
            command: Command::Info,
            test_case: None,
            message: String::new(),
            results: Vec::new(),
        }
    }

    /// Serialized form for the generic listener channel.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// The synthesized console line emitted alongside every dispatch.
    pub fn console_line(&self) -> String {
        let test_case = match self.test_case {
            Some(tc) => tc.to_string(),
            None => "-".to_string(),
        };
        format!(
            "cmd: {}, test_case: {}, msg: {}",
            self.command, test_case, self.message
        )
    }
}

impl Default for MeasurementEvent {
    fn default() -> Self {
        Self::new()
    }
}
