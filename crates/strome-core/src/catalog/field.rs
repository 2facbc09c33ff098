//! Field descriptors: scalar and array properties of an entity.

use std::collections::BTreeMap;

use serde::Serialize;
use strome_proto::{FieldValue, Mapping, ValueKind};

use super::types::StorageAttributeKind;
use crate::error::ConversionError;

/// A native property type with a lossless mapping to one [`FieldValue`] variant.
///
/// ```
/// use strome_core::catalog::FieldType;
/// use strome_proto::FieldValue;
///
/// assert_eq!(45i64.to_field_value(), FieldValue::Integer(45));
/// assert_eq!(Option::<String>::from_field_value(&FieldValue::Null).unwrap(), None);
/// assert!(i64::from_field_value(&FieldValue::Text("45".into())).is_err());
/// ```
pub trait FieldType: Sized {
    /// Advisory backing-column type.
    const ATTRIBUTE: StorageAttributeKind = StorageAttributeKind::Undefined;

    /// Whether a missing or null dictionary entry decodes to "no value".
    const OPTIONAL: bool = false;

    /// Reduce the property to its field value.
    fn to_field_value(&self) -> FieldValue;

    /// Rebuild the property from a field value.
    fn from_field_value(value: &FieldValue) -> Result<Self, ConversionError>;

    /// The value a missing key decodes to, if the type allows absence.
    fn absent() -> Option<Self> {
        None
    }
}

impl FieldType for String {
    const ATTRIBUTE: StorageAttributeKind = StorageAttributeKind::String;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }

    fn from_field_value(value: &FieldValue) -> Result<Self, ConversionError> {
        value
            .as_text()
            .map(str::to_owned)
            .ok_or_else(|| ConversionError::mismatch(ValueKind::Text, value.kind()))
    }
}

impl FieldType for bool {
    const ATTRIBUTE: StorageAttributeKind = StorageAttributeKind::Boolean;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Bool(*self)
    }

    fn from_field_value(value: &FieldValue) -> Result<Self, ConversionError> {
        value
            .as_bool()
            .ok_or_else(|| ConversionError::mismatch(ValueKind::Bool, value.kind()))
    }
}

impl FieldType for i64 {
    const ATTRIBUTE: StorageAttributeKind = StorageAttributeKind::Integer;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Integer(*self)
    }

    fn from_field_value(value: &FieldValue) -> Result<Self, ConversionError> {
        value
            .as_integer()
            .ok_or_else(|| ConversionError::mismatch(ValueKind::Integer, value.kind()))
    }
}

macro_rules! narrow_integer {
    ($($ty:ty),*) => {
        $(
            impl FieldType for $ty {
                const ATTRIBUTE: StorageAttributeKind = StorageAttributeKind::Integer;

                fn to_field_value(&self) -> FieldValue {
                    FieldValue::Integer(i64::from(*self))
                }

                fn from_field_value(value: &FieldValue) -> Result<Self, ConversionError> {
                    let wide = i64::from_field_value(value)?;
                    <$ty>::try_from(wide).map_err(|_| ConversionError::OutOfRange {
                        value: wide.to_string(),
                        target: stringify!($ty),
                    })
                }
            }
        )*
    };
}

narrow_integer!(i32, u32, i16, u16, u8);

impl FieldType for f64 {
    const ATTRIBUTE: StorageAttributeKind = StorageAttributeKind::Float;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Float(*self)
    }

    fn from_field_value(value: &FieldValue) -> Result<Self, ConversionError> {
        value
            .as_float()
            .ok_or_else(|| ConversionError::mismatch(ValueKind::Float, value.kind()))
    }
}

impl FieldType for f32 {
    const ATTRIBUTE: StorageAttributeKind = StorageAttributeKind::Float;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Float(f64::from(*self))
    }

    fn from_field_value(value: &FieldValue) -> Result<Self, ConversionError> {
        let wide = f64::from_field_value(value)?;
        let narrow = wide as f32;
        if wide.is_finite() && !narrow.is_finite() {
            return Err(ConversionError::OutOfRange {
                value: wide.to_string(),
                target: "f32",
            });
        }
        Ok(narrow)
    }
}

impl<T: FieldType> FieldType for Option<T> {
    const ATTRIBUTE: StorageAttributeKind = T::ATTRIBUTE;
    const OPTIONAL: bool = true;

    fn to_field_value(&self) -> FieldValue {
        match self {
            Some(value) => value.to_field_value(),
            None => FieldValue::Null,
        }
    }

    fn from_field_value(value: &FieldValue) -> Result<Self, ConversionError> {
        match value {
            FieldValue::Null => Ok(None),
            other => T::from_field_value(other).map(Some),
        }
    }

    fn absent() -> Option<Self> {
        Some(None)
    }
}

impl<T: FieldType> FieldType for Vec<T> {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Sequence(self.iter().map(FieldType::to_field_value).collect())
    }

    fn from_field_value(value: &FieldValue) -> Result<Self, ConversionError> {
        let items = value
            .as_sequence()
            .ok_or_else(|| ConversionError::mismatch(ValueKind::Sequence, value.kind()))?;
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                T::from_field_value(item).map_err(|e| ConversionError::Element {
                    index,
                    source: Box::new(e),
                })
            })
            .collect()
    }
}

impl<T: FieldType> FieldType for BTreeMap<String, T> {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Mapping(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_field_value()))
                .collect::<Mapping>(),
        )
    }

    fn from_field_value(value: &FieldValue) -> Result<Self, ConversionError> {
        let map = value
            .as_mapping()
            .ok_or_else(|| ConversionError::mismatch(ValueKind::Mapping, value.kind()))?;
        map.iter()
            .map(|(key, item)| {
                T::from_field_value(item)
                    .map(|v| (key.clone(), v))
                    .map_err(|e| ConversionError::Entry {
                        key: key.clone(),
                        source: Box::new(e),
                    })
            })
            .collect()
    }
}

/// Raw bytes, stored as a sequence of integers in `0..=255`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Binary(pub Vec<u8>);

impl FieldType for Binary {
    const ATTRIBUTE: StorageAttributeKind = StorageAttributeKind::Binary;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Sequence(
            self.0
                .iter()
                .map(|b| FieldValue::Integer(i64::from(*b)))
                .collect(),
        )
    }

    fn from_field_value(value: &FieldValue) -> Result<Self, ConversionError> {
        Vec::<u8>::from_field_value(value).map(Binary)
    }
}

/// Declaration of one field within an entity schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    /// Property name (dictionary key).
    pub name: String,
    /// Advisory backing-column type.
    pub attribute: StorageAttributeKind,
    /// Whether the field may be absent.
    pub optional: bool,
}

impl FieldDef {
    /// Declare a field of native type `T`.
    pub fn of<T: FieldType>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: T::ATTRIBUTE,
            optional: T::OPTIONAL,
        }
    }

    /// Override the advisory attribute kind.
    pub fn with_attribute(mut self, attribute: StorageAttributeKind) -> Self {
        self.attribute = attribute;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_roundtrip() {
        assert_eq!(String::from_field_value(&"Delhi".to_string().to_field_value()).unwrap(), "Delhi");
        assert!(bool::from_field_value(&true.to_field_value()).unwrap());
        assert_eq!(f64::from_field_value(&2.5f64.to_field_value()).unwrap(), 2.5);
        assert_eq!(f32::from_field_value(&0.1f32.to_field_value()).unwrap(), 0.1f32);
        assert_eq!(i32::from_field_value(&(-7i32).to_field_value()).unwrap(), -7);
    }

    #[test]
    fn test_kind_mismatch() {
        let err = i64::from_field_value(&FieldValue::Float(1.0)).unwrap_err();
        assert_eq!(
            err,
            ConversionError::KindMismatch {
                expected: ValueKind::Integer,
                found: ValueKind::Float
            }
        );
        assert!(String::from_field_value(&FieldValue::Null).is_err());
    }

    #[test]
    fn test_narrowing_out_of_range() {
        let err = u8::from_field_value(&FieldValue::Integer(300)).unwrap_err();
        assert!(matches!(err, ConversionError::OutOfRange { target: "u8", .. }));
        assert!(u32::from_field_value(&FieldValue::Integer(-1)).is_err());
    }

    #[test]
    fn test_optional_null_roundtrip() {
        let none: Option<String> = None;
        assert_eq!(none.to_field_value(), FieldValue::Null);
        assert_eq!(Option::<String>::from_field_value(&FieldValue::Null).unwrap(), None);
        assert_eq!(Option::<String>::absent(), Some(None));
        assert_eq!(String::absent(), None);
        assert!(Option::<i64>::OPTIONAL);
    }

    #[test]
    fn test_sequence_element_error() {
        let value = FieldValue::Sequence(vec!["a".into(), FieldValue::Integer(1)]);
        let err = Vec::<String>::from_field_value(&value).unwrap_err();
        assert!(matches!(err, ConversionError::Element { index: 1, .. }));
    }

    #[test]
    fn test_string_map() {
        let mut map = BTreeMap::new();
        map.insert("home".to_string(), 1i64);
        map.insert("work".to_string(), 2i64);

        let value = map.to_field_value();
        assert!(value.as_mapping().is_some());
        assert_eq!(BTreeMap::<String, i64>::from_field_value(&value).unwrap(), map);
    }

    #[test]
    fn test_binary() {
        let bytes = Binary(vec![0, 127, 255]);
        let value = bytes.to_field_value();
        assert_eq!(Binary::from_field_value(&value).unwrap(), bytes);
        assert_eq!(Binary::ATTRIBUTE, StorageAttributeKind::Binary);

        let bad = FieldValue::Sequence(vec![FieldValue::Integer(256)]);
        assert!(Binary::from_field_value(&bad).is_err());
    }

    #[test]
    fn test_field_def() {
        let field = FieldDef::of::<Option<String>>("middleName");
        assert_eq!(field.name, "middleName");
        assert!(field.optional);
        assert_eq!(field.attribute, StorageAttributeKind::String);

        let field = FieldDef::of::<Vec<String>>("phoneNumbers");
        assert!(!field.optional);
        assert!(field.attribute.is_undefined());

        let field = FieldDef::of::<String>("pinCode").with_attribute(StorageAttributeKind::Integer);
        assert_eq!(field.attribute, StorageAttributeKind::Integer);
    }
}
