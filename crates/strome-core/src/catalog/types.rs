//! Storage attribute kinds.

use serde::{Deserialize, Serialize};

/// Intended backing-column type of a field.
///
/// Purely advisory: a store may use it to pick a column type, the mapping
/// core never enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageAttributeKind {
    /// No declared column type.
    #[default]
    Undefined,
    /// UTF-8 string.
    String,
    /// Signed integer.
    Integer,
    /// Floating point.
    Float,
    /// Boolean.
    Boolean,
    /// Raw bytes.
    Binary,
}

impl StorageAttributeKind {
    /// Check if a store is free to choose the column type.
    pub fn is_undefined(&self) -> bool {
        matches!(self, StorageAttributeKind::Undefined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_undefined() {
        assert_eq!(StorageAttributeKind::default(), StorageAttributeKind::Undefined);
        assert!(StorageAttributeKind::default().is_undefined());
        assert!(!StorageAttributeKind::Binary.is_undefined());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&StorageAttributeKind::Boolean).unwrap();
        assert_eq!(json, "\"boolean\"");
    }
}
