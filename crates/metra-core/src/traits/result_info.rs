//! ResultInfo — anything that can serialize itself into a nested record.
//!
//! Identity is structural: two results are the same if their serialized
//! records compare equal. There is no shared base state.

use serde_json::{Map, Value};

pub trait ResultInfo {
    /// Serialize into a nested record (string-keyed map whose values are
    /// scalars, nested records or arrays of either).
    fn to_record(&self) -> Value;
}

impl ResultInfo for Value {
    fn to_record(&self) -> Value {
        self.clone()
    }
}

impl ResultInfo for Map<String, Value> {
    fn to_record(&self) -> Value {
        Value::Object(self.clone())
    }
}
