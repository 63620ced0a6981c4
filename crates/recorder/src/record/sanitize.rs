//! Conversion of built records into their on-disk form.
//!
//! This is the only place that decides how values are written: absent
//! slots disappear, positions get a fixed precision, keys become snake_case.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Number, Value as Json};

use super::value::{Record, Value};

/// Decimal places kept for positions.
pub const COORD_PRECISION: usize = 1;

/// Immutable, serialization-ready record.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SanitizedRecord {
    fields: Map<String, Json>,
}

impl SanitizedRecord {
    pub fn get(&self, key: &str) -> Option<&Json> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }

    /// One compact JSON object without a trailing newline.
    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SanitizedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = serde_json::to_string(&self.fields).map_err(|_| fmt::Error)?;
        f.write_str(&line)
    }
}

/// Filters and formats a record for output.
pub fn sanitize(record: &Record) -> SanitizedRecord {
    SanitizedRecord {
        fields: sanitize_fields(record),
    }
}

fn sanitize_fields(record: &Record) -> Map<String, Json> {
    let mut fields = Map::new();
    for (key, value) in record.iter() {
        if let Some(json) = value.and_then(sanitize_value) {
            fields.insert(normalize_key(key), json);
        }
    }
    fields
}

fn sanitize_value(value: &Value) -> Option<Json> {
    match value {
        Value::Bool(flag) => Some(Json::Bool(*flag)),
        Value::Int(number) => Some(Json::from(*number)),
        Value::UInt(number) => Some(Json::from(*number)),
        Value::Float(number) => Number::from_f64(*number).map(Json::Number),
        Value::Coord(number) => format_coord(*number).map(Json::String),
        Value::Text(text) => Some(Json::String(text.clone())),
        Value::List(items) => Some(Json::Array(
            items.iter().filter_map(sanitize_value).collect(),
        )),
        Value::Map(record) => {
            let fields = sanitize_fields(record);
            (!fields.is_empty()).then_some(Json::Object(fields))
        }
    }
}

/// Fixed-precision rendering of a coordinate, `None` when not finite.
pub fn format_coord(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    let text = format!("{:.*}", COORD_PRECISION, value);
    // -0.04 rounds to "-0.0"
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        return Some(text[1..].to_owned());
    }
    Some(text)
}

/// Lower snake_case form of a field name.
pub fn normalize_key(key: &str) -> String {
    let mut normalized = String::with_capacity(key.len() + 4);
    let mut previous: Option<char> = None;
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            if previous.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit()) {
                normalized.push('_');
            }
            normalized.push(ch.to_ascii_lowercase());
        } else if matches!(ch, '-' | ' ' | '.') {
            normalized.push('_');
        } else {
            normalized.push(ch);
        }
        previous = Some(ch);
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_have_one_decimal() {
        let record = Record::new()
            .with("x", Value::coord(12.345))
            .with("y", Value::coord(7.0));

        assert_eq!(sanitize(&record).to_line(), r#"{"x":"12.3","y":"7.0"}"#);
    }

    #[test]
    fn negative_zero_is_normalized() {
        assert_eq!(format_coord(-0.04).as_deref(), Some("0.0"));
        assert_eq!(format_coord(-0.06).as_deref(), Some("-0.1"));
        assert_eq!(format_coord(f64::NAN), None);
    }

    #[test]
    fn absent_values_are_omitted() {
        let record = Record::new()
            .with("tick", 10u64)
            .with("category", "construction")
            .with("event", "built_entity")
            .with("a", 1u32)
            .with_opt::<u32>("b", None)
            .with("c", "text")
            .with_opt::<String>("d", None)
            .with("e", true)
            .with("f", 2.5)
            .with_opt::<bool>("g", None)
            .with("h", Value::coord(1.0));

        let sanitized = sanitize(&record);
        assert_eq!(sanitized.len(), 3 + 5);
        assert!(!sanitized.contains("b"));
        assert!(!sanitized.to_line().contains("null"));
    }

    #[test]
    fn empty_nested_records_and_non_finite_floats_are_dropped() {
        let record = Record::new()
            .with("tick", 1u64)
            .with("entity", Record::new().with_opt::<String>("name", None))
            .with("speed", f64::INFINITY)
            .with("label", "");

        let sanitized = sanitize(&record);
        let keys: Vec<_> = sanitized.keys().collect();
        assert_eq!(keys, vec!["tick", "label"]);
    }

    #[test]
    fn keys_are_snake_case() {
        assert_eq!(normalize_key("unitNumber"), "unit_number");
        assert_eq!(normalize_key("gui-type"), "gui_type");
        assert_eq!(normalize_key("LeftTop"), "left_top");
        assert_eq!(normalize_key("start_movement"), "start_movement");
    }

    #[test]
    fn field_order_follows_insertion() {
        let record = Record::new()
            .with("tick", 3u64)
            .with("zeta", 1u32)
            .with("alpha", 2u32);

        assert_eq!(sanitize(&record).to_line(), r#"{"tick":3,"zeta":1,"alpha":2}"#);
    }
}
