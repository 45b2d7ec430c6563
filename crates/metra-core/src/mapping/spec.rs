//! Mapping specification types.
//!
//! A spec is a JSON document of the form
//!
//! ```json
//! {
//!   "general":     { "type": "object", "mappings": [ ... ] },
//!   "throughputs": { "type": "array",  "mappings": [ ... ] }
//! }
//! ```
//!
//! Group order is preserved from the document; it does not affect output
//! correctness but fixes rule-evaluation order, which matters for the
//! fail-fast abort semantics of the engine.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::ConfigError;

/// Group key that resolves to the root record instead of a sub-record.
pub const ROOT_GROUP: &str = "general";

/// How a group resolves its source: a named sub-record or a named array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Object,
    Array,
    /// Tolerated on load; evaluation logs a warning and skips the group.
    #[serde(other)]
    Unknown,
}

/// Rule kind. In array groups this is the aggregation; in object groups
/// only `Int` is meaningful (integer division for `convert`); `Index` is
/// only meaningful inside nested projection rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Last,
    Max,
    Min,
    All,
    Array,
    Index,
    Int,
    /// Absent or unrecognized; evaluation warns where a kind is required.
    #[default]
    #[serde(other)]
    None,
}

/// Declarative descriptor of one output field.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingRule {
    pub new_key: String,
    #[serde(default)]
    pub old_key: String,
    /// Optional second source field used as a divisor (e.g. elapsed time)
    /// by the `max`/`min` aggregations.
    #[serde(default)]
    pub old_key_divider: String,
    #[serde(rename = "type", default)]
    pub kind: RuleKind,
    /// Divisor applied to the written output value; NaN means none.
    #[serde(default = "nan")]
    pub convert: f64,
    #[serde(default = "nan")]
    pub convert_multiplier: f64,
    /// Optional date-format pattern applied after conversion.
    #[serde(default)]
    pub format: String,
    /// Nested rule list for the `array` projection kind.
    #[serde(default)]
    pub mappings: Vec<MappingRule>,
}

fn nan() -> f64 {
    f64::NAN
}

/// One group of rules, evaluated against a named source field (or the
/// root record for the `general` object group).
#[derive(Debug, Clone, Deserialize)]
pub struct MappingGroup {
    #[serde(rename = "type")]
    pub kind: GroupKind,
    #[serde(rename = "mappings")]
    pub rules: Vec<MappingRule>,
}

/// Ordered mapping of group key to group, loaded once per transform
/// session; not hot-reloaded mid-transform.
#[derive(Debug, Clone, Default)]
pub struct MappingSpec {
    pub groups: Vec<(String, MappingGroup)>,
}

impl MappingSpec {
    pub fn from_json_value(value: Value) -> Result<Self, ConfigError> {
        let Value::Object(map) = value else {
            return Err(ConfigError::Parse {
                path: "<mapping spec>".to_string(),
                message: "mapping spec must be a JSON object".to_string(),
            });
        };

        let mut groups = Vec::with_capacity(map.len());
        for (key, group) in map {
            let group: MappingGroup =
                serde_json::from_value(group).map_err(|e| ConfigError::Parse {
                    path: format!("<mapping spec>.{key}"),
                    message: e.to_string(),
                })?;
            groups.push((key, group));
        }
        Ok(Self { groups })
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            path: "<mapping spec>".to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_value(value)
    }

    /// Load a spec from a JSON file on disk.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&json)
    }
}
