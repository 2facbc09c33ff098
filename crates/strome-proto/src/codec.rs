//! Object-notation encoding for entity dictionaries.
//!
//! The codec is only a transport: it converts a [`Mapping`] to bytes and
//! back without losing the distinction between integers and floats.

use serde_json::{Map, Number, Value as JsonValue};

use crate::error::Error;
use crate::value::{FieldValue, Mapping};

/// Options controlling encoded output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Indent the output for human readers.
    pub pretty: bool,
}

impl EncodeOptions {
    /// Compact output.
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    /// Indented output.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

/// Convert a field value to a JSON value.
pub fn to_json(value: &FieldValue) -> Result<JsonValue, Error> {
    Ok(match value {
        FieldValue::Null => JsonValue::Null,
        FieldValue::Bool(b) => JsonValue::Bool(*b),
        FieldValue::Integer(i) => JsonValue::Number(Number::from(*i)),
        FieldValue::Float(f) => {
            JsonValue::Number(Number::from_f64(*f).ok_or(Error::NonFiniteFloat(*f))?)
        }
        FieldValue::Text(s) => JsonValue::String(s.clone()),
        FieldValue::Sequence(items) => {
            JsonValue::Array(items.iter().map(to_json).collect::<Result<_, _>>()?)
        }
        FieldValue::Mapping(map) => JsonValue::Object(mapping_to_json(map)?),
    })
}

/// Convert a JSON value to a field value.
pub fn from_json(value: JsonValue) -> Result<FieldValue, Error> {
    Ok(match value {
        JsonValue::Null => FieldValue::Null,
        JsonValue::Bool(b) => FieldValue::Bool(b),
        JsonValue::Number(n) => number_to_value(&n)?,
        JsonValue::String(s) => FieldValue::Text(s),
        JsonValue::Array(items) => {
            FieldValue::Sequence(items.into_iter().map(from_json).collect::<Result<_, _>>()?)
        }
        JsonValue::Object(object) => FieldValue::Mapping(json_to_mapping(object)?),
    })
}

/// Encode a mapping to bytes.
pub fn encode_mapping(map: &Mapping, options: EncodeOptions) -> Result<Vec<u8>, Error> {
    let json = JsonValue::Object(mapping_to_json(map)?);
    let bytes = if options.pretty {
        serde_json::to_vec_pretty(&json)?
    } else {
        serde_json::to_vec(&json)?
    };
    Ok(bytes)
}

/// Decode a mapping from bytes.
///
/// The top-level value must be an object.
pub fn decode_mapping(bytes: &[u8]) -> Result<Mapping, Error> {
    match serde_json::from_slice::<JsonValue>(bytes)? {
        JsonValue::Object(object) => json_to_mapping(object),
        other => Err(Error::Deserialization(format!(
            "expected an object at top level, found {}",
            json_kind(&other)
        ))),
    }
}

fn mapping_to_json(map: &Mapping) -> Result<Map<String, JsonValue>, Error> {
    let mut object = Map::with_capacity(map.len());
    for (key, value) in map {
        object.insert(key.clone(), to_json(value)?);
    }
    Ok(object)
}

fn json_to_mapping(object: Map<String, JsonValue>) -> Result<Mapping, Error> {
    object
        .into_iter()
        .map(|(key, value)| Ok((key, from_json(value)?)))
        .collect()
}

fn number_to_value(n: &Number) -> Result<FieldValue, Error> {
    if let Some(i) = n.as_i64() {
        return Ok(FieldValue::Integer(i));
    }
    // Unsigned literals above i64::MAX would silently lose precision as floats.
    if n.is_u64() {
        return Err(Error::IntegerOutOfRange(n.to_string()));
    }
    n.as_f64()
        .map(FieldValue::Float)
        .ok_or_else(|| Error::Deserialization(format!("unrepresentable number {n}")))
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
