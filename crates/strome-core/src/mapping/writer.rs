//! Entity to dictionary encoding.

use strome_proto::{FieldValue, Mapping};

use crate::catalog::{EntitySchema, FieldType, Relationship, RelationshipTarget, Shape};
use crate::error::MappingError;
use crate::mapping::Entity;

/// Collects the properties of one entity into a [`Mapping`].
///
/// Relationships are checked against the schema's declarations as they are
/// written. The first mismatch is kept and reported by
/// [`DictionaryWriter::finish_checked`].
pub struct DictionaryWriter<'s> {
    schema: &'s EntitySchema,
    map: Mapping,
    error: Option<MappingError>,
}

impl<'s> DictionaryWriter<'s> {
    /// Create a writer for an entity of the given schema.
    pub fn new(schema: &'s EntitySchema) -> Self {
        Self {
            schema,
            map: Mapping::new(),
            error: None,
        }
    }

    /// The schema being written.
    pub fn schema(&self) -> &EntitySchema {
        self.schema
    }

    /// Write a field value.
    pub fn field<T: FieldType>(&mut self, name: &str, value: &T) -> &mut Self {
        debug_assert!(
            self.schema.get_field(name).is_some(),
            "{} declares no field {name}",
            self.schema.name
        );
        self.map.insert(name.to_string(), value.to_field_value());
        self
    }

    /// Write a relationship as a nested mapping, a sequence of mappings, or null.
    pub fn relationship<T: RelationshipTarget>(
        &mut self,
        name: &str,
        value: &Relationship<T>,
    ) -> &mut Self {
        let check = match self.schema.get_relationship(name) {
            Some(def) => value.check_declaration(&self.schema.name, def),
            None => Err(MappingError::UndeclaredProperty {
                entity: self.schema.name.clone(),
                key: name.to_string(),
            }),
        };
        if let Err(e) = check {
            self.record(e);
        }
        let encoded = self.encode_related(name, value.value());
        self.map.insert(name.to_string(), encoded);
        self
    }

    /// Write a raw value under a key.
    pub fn raw(&mut self, name: &str, value: FieldValue) -> &mut Self {
        self.map.insert(name.to_string(), value);
        self
    }

    /// The first relationship mismatch seen so far.
    pub fn error(&self) -> Option<&MappingError> {
        self.error.as_ref()
    }

    /// Finish the dictionary. Declared properties left unwritten become null.
    pub fn finish(self) -> Mapping {
        self.into_parts().0
    }

    /// Finish the dictionary, failing on the first relationship mismatch.
    pub fn finish_checked(self) -> Result<Mapping, MappingError> {
        match self.into_parts() {
            (_, Some(e)) => Err(e),
            (map, None) => Ok(map),
        }
    }

    fn into_parts(mut self) -> (Mapping, Option<MappingError>) {
        for name in self.schema.property_names() {
            if !self.map.contains_key(name) {
                self.map.insert(name.to_string(), FieldValue::Null);
            }
        }
        (self.map, self.error)
    }

    fn record(&mut self, error: MappingError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn encode_related<T: RelationshipTarget>(&mut self, name: &str, value: &T) -> FieldValue {
        if value.is_absent() {
            return FieldValue::Null;
        }
        let schema = T::Target::schema();
        let related = value.related();
        match T::SHAPE {
            Shape::One => match related.first() {
                Some(entity) => self.encode_one(&schema, *entity, name.to_string()),
                None => FieldValue::Null,
            },
            Shape::Many => FieldValue::Sequence(
                related
                    .into_iter()
                    .enumerate()
                    .map(|(i, entity)| self.encode_one(&schema, entity, format!("{name}[{i}]")))
                    .collect(),
            ),
        }
    }

    fn encode_one<E: Entity>(&mut self, schema: &EntitySchema, entity: &E, key: String) -> FieldValue {
        let mut writer = DictionaryWriter::new(schema);
        entity.write(&mut writer);
        let (map, error) = writer.into_parts();
        if let Some(source) = error {
            self.record(MappingError::Nested {
                entity: self.schema.name.clone(),
                key,
                source: Box::new(source),
            });
        }
        FieldValue::Mapping(map)
    }
}
