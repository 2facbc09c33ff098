//! Dictionary to entity decoding.

use strome_proto::{FieldValue, Mapping};

use crate::catalog::{EntitySchema, FieldType, Relationship, RelationshipTarget};
use crate::error::MappingError;

/// Typed access to the properties of one entity dictionary.
///
/// Keys the schema does not declare are ignored. A missing or null key
/// decodes to "no value" for optional properties and fails with
/// [`MappingError::MissingKey`] otherwise.
pub struct DictionaryReader<'a> {
    schema: &'a EntitySchema,
    map: &'a Mapping,
}

impl<'a> DictionaryReader<'a> {
    /// Create a reader over a dictionary.
    pub fn new(schema: &'a EntitySchema, map: &'a Mapping) -> Self {
        Self { schema, map }
    }

    /// The schema being read.
    pub fn schema(&self) -> &EntitySchema {
        self.schema
    }

    /// The raw dictionary.
    pub fn raw(&self) -> &Mapping {
        self.map
    }

    fn missing(&self, name: &str) -> MappingError {
        MappingError::MissingKey {
            entity: self.schema.name.clone(),
            key: name.to_string(),
        }
    }

    /// Read a field.
    pub fn field<T: FieldType>(&self, name: &str) -> Result<T, MappingError> {
        match self.map.get(name) {
            None | Some(FieldValue::Null) => T::absent().ok_or_else(|| self.missing(name)),
            Some(value) => T::from_field_value(value).map_err(|source| MappingError::Field {
                entity: self.schema.name.clone(),
                key: name.to_string(),
                source,
            }),
        }
    }

    /// Read a relationship, applying the declared delete rule and cardinality.
    pub fn relationship<T: RelationshipTarget>(
        &self,
        name: &str,
    ) -> Result<Relationship<T>, MappingError> {
        let def = self
            .schema
            .get_relationship(name)
            .ok_or_else(|| MappingError::UndeclaredProperty {
                entity: self.schema.name.clone(),
                key: name.to_string(),
            })?;

        let value = match self.map.get(name) {
            None | Some(FieldValue::Null) => T::absent().ok_or_else(|| self.missing(name))?,
            Some(value) => T::decode(&self.schema.name, name, value)?,
        };

        Relationship::from_def(def, value).map_err(|source| MappingError::Cardinality {
            entity: self.schema.name.clone(),
            key: name.to_string(),
            source,
        })
    }
}
