//! The transform engine: pure function from a nested raw sample and a
//! mapping spec to a flat report record.
//!
//! Failure policy: an error in any single rule aborts evaluation of all
//! remaining groups and rules; output fields already written are returned
//! as-is (no rollback). Only an unrecognized rule or group kind is
//! non-fatal — that logs a warning and evaluation continues.

use serde_json::{Map, Number, Value};

use super::spec::{GroupKind, MappingRule, MappingSpec, RuleKind, ROOT_GROUP};
use crate::errors::MappingError;

/// Flat output record: string keys, scalar/array values.
pub type FlatRecord = Map<String, Value>;

/// Transform a raw nested sample into a flat record.
///
/// A `None` input yields an empty record without error. On a rule
/// evaluation error the partial output built so far is returned and the
/// abort is logged with its context.
pub fn transform(original: Option<&Value>, spec: &MappingSpec) -> FlatRecord {
    let mut mapped = FlatRecord::new();
    let Some(original) = original else {
        return mapped;
    };

    if let Err(error) = apply_groups(original, spec, &mut mapped) {
        tracing::warn!(error = %error, "mapping aborted, returning partial output");
    }
    mapped
}

fn apply_groups(
    original: &Value,
    spec: &MappingSpec,
    mapped: &mut FlatRecord,
) -> Result<(), MappingError> {
    for (key, group) in &spec.groups {
        match group.kind {
            GroupKind::Object => apply_object_group(original, key, &group.rules, mapped)?,
            GroupKind::Array => apply_array_group(original, key, &group.rules, mapped)?,
            GroupKind::Unknown => {
                tracing::warn!(group = %key, "unrecognized group kind in mapping spec");
            }
        }
    }
    Ok(())
}

/// Object group: copy `old_key` from the named sub-record (or the root
/// record for the `general` group) to `new_key`, then apply the optional
/// convert division and date formatting to the written value.
fn apply_object_group(
    original: &Value,
    group: &str,
    rules: &[MappingRule],
    mapped: &mut FlatRecord,
) -> Result<(), MappingError> {
    let source = if group == ROOT_GROUP {
        Some(original)
    } else {
        original.get(group)
    };
    // A missing or non-object source skips the group without error.
    let Some(source) = source.and_then(Value::as_object) else {
        return Ok(());
    };

    for rule in rules {
        if let Some(value) = source.get(&rule.old_key) {
            mapped.insert(rule.new_key.clone(), value.clone());
        }

        if !rule.convert.is_nan() {
            let raw = coerce_i64(mapped.get(&rule.new_key));
            let converted = if rule.kind == RuleKind::Int {
                let divisor = rule.convert as i64;
                if divisor == 0 {
                    return Err(MappingError::InvalidRule {
                        group: group.to_string(),
                        key: rule.new_key.clone(),
                        message: "integer convert divisor is zero".to_string(),
                    });
                }
                Value::from(raw / divisor)
            } else {
                number(raw as f64 / rule.convert)
            };
            mapped.insert(rule.new_key.clone(), converted);

            if !rule.format.is_empty() {
                let timestamp = coerce_i64(mapped.get(&rule.new_key));
                mapped.insert(
                    rule.new_key.clone(),
                    Value::String(format_timestamp(timestamp, &rule.format)),
                );
            }
        }
    }
    Ok(())
}

/// Array group: resolve the named array and aggregate per rule.
fn apply_array_group(
    original: &Value,
    group: &str,
    rules: &[MappingRule],
    mapped: &mut FlatRecord,
) -> Result<(), MappingError> {
    // A missing or non-array source skips the group without error.
    let Some(items) = original.get(group).and_then(Value::as_array) else {
        return Ok(());
    };

    for rule in rules {
        // `max`/`min` fold `convert` into the per-element formula and mark
        // it consumed so the generic division below does not double-apply.
        let mut convert = rule.convert;

        match rule.kind {
            RuleKind::Last => {
                let last = items.last().ok_or_else(|| MappingError::EmptyArray {
                    group: group.to_string(),
                })?;
                let element = require_object(last, group, &rule.old_key)?;
                if let Some(value) = element.get(&rule.old_key) {
                    mapped.insert(rule.new_key.clone(), value.clone());
                }
            }
            RuleKind::Max | RuleKind::Min => {
                if let Some(best) = aggregate_extremum(items, rule, group)? {
                    mapped.insert(rule.new_key.clone(), Value::from(best));
                }
                convert = f64::NAN;
            }
            RuleKind::All => {
                let serialized = Value::Array(items.clone()).to_string();
                mapped.insert(rule.new_key.clone(), Value::String(serialized));
            }
            RuleKind::Array => {
                let projected = project_array(items, rule, group)?;
                mapped.insert(rule.new_key.clone(), Value::Array(projected));
            }
            RuleKind::Index | RuleKind::Int | RuleKind::None => {
                tracing::warn!(
                    group = %group,
                    rule = %rule.new_key,
                    "unrecognized aggregation kind in mapping spec"
                );
            }
        }

        if !convert.is_nan() {
            let raw = coerce_i64(mapped.get(&rule.new_key));
            mapped.insert(rule.new_key.clone(), number(raw as f64 / convert));
        }
    }
    Ok(())
}

/// `max`/`min`: over all elements, `(element[old_key] * convert_multiplier)
/// / (element[old_key_divider] / convert)`, skipping elements whose divider
/// is zero. Returns the extremum truncated to an integer, or `None` when no
/// element qualifies (the output field is then omitted entirely).
fn aggregate_extremum(
    items: &[Value],
    rule: &MappingRule,
    group: &str,
) -> Result<Option<i64>, MappingError> {
    let mut best: Option<i64> = None;
    for item in items {
        let element = require_object(item, group, &rule.old_key)?;
        let divider = require_f64(element, &rule.old_key_divider, group)?;
        if divider == 0.0 {
            continue;
        }
        let base = require_i64(element, &rule.old_key, group)?;
        let value = (base as f64 * rule.convert_multiplier) / (divider / rule.convert);

        let better = match best {
            // first qualifying element wins unless the formula degenerated
            None => !value.is_nan(),
            Some(b) => match rule.kind {
                RuleKind::Max => value > b as f64,
                _ => value < b as f64,
            },
        };
        if better {
            best = Some(value as i64);
        }
    }
    Ok(best)
}

/// `array` projection: one output sub-record per source element, built
/// from the nested rule list. A nested `index` rule writes the 1-based
/// element position; a nested `convert` divides the coerced source value;
/// otherwise the source field is copied and must exist.
fn project_array(
    items: &[Value],
    rule: &MappingRule,
    group: &str,
) -> Result<Vec<Value>, MappingError> {
    let mut projected = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        let element = require_object(item, group, &rule.new_key)?;
        let mut record = FlatRecord::new();
        for nested in &rule.mappings {
            if !nested.convert.is_nan() {
                let raw = coerce_i64(element.get(&nested.old_key));
                record.insert(nested.new_key.clone(), number(raw as f64 / nested.convert));
            } else if nested.kind == RuleKind::Index {
                record.insert(nested.new_key.clone(), Value::from(position as i64 + 1));
            } else {
                let value =
                    element
                        .get(&nested.old_key)
                        .ok_or_else(|| MappingError::MissingField {
                            group: group.to_string(),
                            key: nested.old_key.clone(),
                        })?;
                record.insert(nested.new_key.clone(), value.clone());
            }
        }
        projected.push(Value::Object(record));
    }
    Ok(projected)
}

fn require_object<'a>(
    value: &'a Value,
    group: &str,
    key: &str,
) -> Result<&'a Map<String, Value>, MappingError> {
    value.as_object().ok_or_else(|| MappingError::TypeMismatch {
        group: group.to_string(),
        key: key.to_string(),
        expected: "an object",
    })
}

/// Strict numeric read: the field must exist and be a number or a numeric
/// string. Mirrors the source's throwing accessors inside aggregations.
fn require_f64(
    element: &Map<String, Value>,
    key: &str,
    group: &str,
) -> Result<f64, MappingError> {
    let value = element.get(key).ok_or_else(|| MappingError::MissingField {
        group: group.to_string(),
        key: key.to_string(),
    })?;
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| type_mismatch(group, key)),
        Value::String(s) => s.parse::<f64>().map_err(|_| type_mismatch(group, key)),
        _ => Err(type_mismatch(group, key)),
    }
}

fn require_i64(
    element: &Map<String, Value>,
    key: &str,
    group: &str,
) -> Result<i64, MappingError> {
    require_f64(element, key, group).map(|v| v as i64)
}

fn type_mismatch(group: &str, key: &str) -> MappingError {
    MappingError::TypeMismatch {
        group: group.to_string(),
        key: key.to_string(),
        expected: "a number",
    }
}

/// Lenient numeric coercion of an already-written output value: numbers
/// truncate to integer, numeric strings parse, everything else is 0.
fn coerce_i64(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s
            .parse::<i64>()
            .ok()
            .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

fn number(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

/// Format a millisecond UTC timestamp with a date pattern using the
/// `yyyy`/`MM`/`dd`/`HH`/`mm`/`ss` token alphabet; other characters are
/// copied through literally.
fn format_timestamp(millis: i64, pattern: &str) -> String {
    let secs = millis.div_euclid(1000);
    let days = secs.div_euclid(86_400);
    let second_of_day = secs.rem_euclid(86_400);
    let (year, month, day) = civil_from_days(days);
    let hour = second_of_day / 3_600;
    let minute = (second_of_day % 3_600) / 60;
    let second = second_of_day % 60;

    let mut out = String::with_capacity(pattern.len());
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }
        match c {
            'y' => push_padded(&mut out, year, run),
            'M' => push_padded(&mut out, i64::from(month), run),
            'd' => push_padded(&mut out, i64::from(day), run),
            'H' => push_padded(&mut out, hour, run),
            'm' => push_padded(&mut out, minute, run),
            's' => push_padded(&mut out, second, run),
            _ => {
                for _ in 0..run {
                    out.push(c);
                }
            }
        }
        i += run;
    }
    out
}

fn push_padded(out: &mut String, value: i64, width: usize) {
    out.push_str(&format!("{value:0width$}"));
}

/// Days since the epoch to a (year, month, day) civil date.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (year + i64::from(month <= 2), month, day)
}
