//! Structured-value transcoding.
//!
//! Opaque application data arrives as JSON (raw text for the instance
//! sub-state, embedded JSON for player metadata) and leaves as
//! `google.protobuf.Struct`, a tagged union of null, bool, number, string,
//! list and struct. Conversion is explicit and fallible: invalid UTF-8,
//! invalid JSON, a non-object top level and nesting deeper than
//! [`MAX_DEPTH`] are all rejected.
//!
//! Numbers become IEEE doubles, as in the protobuf type. Integers beyond
//! 2^53 lose precision.

use prost_types::{value::Kind, ListValue, NullValue, Struct, Value};
use serde_json::{Map, Number};
use thiserror::Error;

/// Deepest accepted nesting of lists and objects.
pub const MAX_DEPTH: usize = 64;

// 2^53: largest range in which every integer is exactly representable.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("not valid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("not valid JSON: {0}")]
    InvalidJson(String),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("nested deeper than {max} levels")]
    TooDeep { max: usize },

    #[error("number {0} is not representable as a double")]
    UnrepresentableNumber(String),
}

/// Decode raw opaque state into a `Struct`.
///
/// Empty or whitespace-only input and a bare JSON `null` mean "no state"
/// and yield `None`.
pub fn decode_opaque(raw: &[u8]) -> Result<Option<Struct>, ValueError> {
    let text = std::str::from_utf8(raw).map_err(|e| ValueError::InvalidUtf8(e.to_string()))?;
    if text.trim().is_empty() {
        return Ok(None);
    }

    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ValueError::InvalidJson(e.to_string()))?;
    if json.is_null() {
        return Ok(None);
    }
    json_to_struct(&json).map(Some)
}

/// Convert a JSON object into a `Struct`.
pub fn json_to_struct(json: &serde_json::Value) -> Result<Struct, ValueError> {
    match json {
        serde_json::Value::Object(map) => object_to_struct(map, 1),
        other => Err(ValueError::NotAnObject(json_kind(other))),
    }
}

fn object_to_struct(
    map: &Map<String, serde_json::Value>,
    depth: usize,
) -> Result<Struct, ValueError> {
    if depth > MAX_DEPTH {
        return Err(ValueError::TooDeep { max: MAX_DEPTH });
    }
    let fields = map
        .iter()
        .map(|(k, v)| to_value(v, depth).map(|v| (k.clone(), v)))
        .collect::<Result<_, _>>()?;
    Ok(Struct { fields })
}

fn to_value(json: &serde_json::Value, depth: usize) -> Result<Value, ValueError> {
    if depth > MAX_DEPTH {
        return Err(ValueError::TooDeep { max: MAX_DEPTH });
    }

    let kind = match json {
        serde_json::Value::Null => Kind::NullValue(NullValue::NullValue as i32),
        serde_json::Value::Bool(b) => Kind::BoolValue(*b),
        serde_json::Value::Number(n) => Kind::NumberValue(
            n.as_f64()
                .filter(|f| f.is_finite())
                .ok_or_else(|| ValueError::UnrepresentableNumber(n.to_string()))?,
        ),
        serde_json::Value::String(s) => Kind::StringValue(s.clone()),
        serde_json::Value::Array(items) => Kind::ListValue(ListValue {
            values: items
                .iter()
                .map(|v| to_value(v, depth + 1))
                .collect::<Result<_, _>>()?,
        }),
        serde_json::Value::Object(map) => Kind::StructValue(object_to_struct(map, depth + 1)?),
    };

    Ok(Value { kind: Some(kind) })
}

/// Convert a `Struct` back to a JSON object.
pub fn struct_to_json(s: &Struct) -> serde_json::Value {
    serde_json::Value::Object(
        s.fields
            .iter()
            .map(|(k, v)| (k.clone(), value_to_json(v)))
            .collect(),
    )
}

/// Convert a protobuf `Value` back to JSON.
///
/// Whole doubles within the exact-integer range come back as JSON integers.
/// A `Value` without a kind is read as null.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(*b),
        Some(Kind::NumberValue(n)) => number_to_json(*n),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s.clone()),
        Some(Kind::ListValue(list)) => {
            serde_json::Value::Array(list.values.iter().map(value_to_json).collect())
        }
        Some(Kind::StructValue(s)) => struct_to_json(s),
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
