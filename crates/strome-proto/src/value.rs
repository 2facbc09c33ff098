//! Runtime value types for entity dictionaries.

use std::collections::BTreeMap;
use std::fmt;

/// A string-keyed dictionary of field values.
///
/// Keys are kept sorted so that serialized output is deterministic.
pub type Mapping = BTreeMap<String, FieldValue>;

/// A persistable value.
///
/// Every scalar or container property of an entity reduces to exactly one
/// of these variants before it is handed to a store.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    /// Absent value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    Text(String),
    /// Ordered list of values.
    Sequence(Vec<FieldValue>),
    /// Nested dictionary.
    Mapping(Mapping),
}

/// The variant tag of a [`FieldValue`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Integer,
    Float,
    Text,
    Sequence,
    Mapping,
}

impl ValueKind {
    /// Lowercase name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Sequence => "sequence",
            ValueKind::Mapping => "mapping",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FieldValue {
    /// Get the variant tag.
    pub fn kind(&self) -> ValueKind {
        match self {
            FieldValue::Null => ValueKind::Null,
            FieldValue::Bool(_) => ValueKind::Bool,
            FieldValue::Integer(_) => ValueKind::Integer,
            FieldValue::Float(_) => ValueKind::Float,
            FieldValue::Text(_) => ValueKind::Text,
            FieldValue::Sequence(_) => ValueKind::Sequence,
            FieldValue::Mapping(_) => ValueKind::Mapping,
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as a sequence.
    pub fn as_sequence(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get as a nested mapping.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            FieldValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Resolve a dotted path (`name.firstName`) through nested mappings.
    pub fn lookup<'a>(map: &'a Mapping, path: &str) -> Option<&'a FieldValue> {
        let mut segments = path.split('.');
        let mut current = map.get(segments.next()?)?;
        for segment in segments {
            current = current.as_mapping()?.get(segment)?;
        }
        Some(current)
    }
}

/// Renders as compact JSON. Non-finite floats render as `null`.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", display_json(self))
    }
}

fn display_json(value: &FieldValue) -> serde_json::Value {
    match value {
        FieldValue::Float(v) => serde_json::Number::from_f64(*v)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        FieldValue::Sequence(items) => {
            serde_json::Value::Array(items.iter().map(display_json).collect())
        }
        FieldValue::Mapping(map) => serde_json::Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), display_json(value)))
                .collect(),
        ),
        scalar => crate::codec::to_json(scalar).unwrap_or(serde_json::Value::Null),
    }
}

// Conversion implementations
impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Integer(v as i64)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<Mapping> for FieldValue {
    fn from(v: Mapping) -> Self {
        FieldValue::Mapping(v)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(v: Vec<FieldValue>) -> Self {
        FieldValue::Sequence(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => FieldValue::Null,
        }
    }
}
