//! Entity schemas.

use std::collections::HashSet;

use serde::Serialize;

use super::field::{FieldDef, FieldType};
use super::relation::{RelationshipDef, RelationshipTarget};
use crate::error::Error;

/// Default migration version of an entity shape.
pub const DEFAULT_MIGRATION_VERSION: u32 = 1;

/// One declared property of an entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropertyDef {
    /// Scalar or array-of-scalar property.
    Field(FieldDef),
    /// Property holding related entities.
    Relationship(RelationshipDef),
}

impl PropertyDef {
    /// Property name (dictionary key).
    pub fn name(&self) -> &str {
        match self {
            PropertyDef::Field(f) => &f.name,
            PropertyDef::Relationship(r) => &r.name,
        }
    }

    /// Whether the property may be absent.
    pub fn is_optional(&self) -> bool {
        match self {
            PropertyDef::Field(f) => f.optional,
            PropertyDef::Relationship(r) => r.optional,
        }
    }
}

/// The explicit, ordered property list of an entity type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySchema {
    /// Entity name (unique within a catalog).
    pub name: String,
    /// Version of the record shape.
    pub migration_version: u32,
    /// Properties in declaration order.
    pub properties: Vec<PropertyDef>,
}

impl EntitySchema {
    /// Create an empty schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            migration_version: DEFAULT_MIGRATION_VERSION,
            properties: Vec::new(),
        }
    }

    /// Set the migration version.
    pub fn with_migration_version(mut self, version: u32) -> Self {
        self.migration_version = version;
        self
    }

    /// Add a field declaration.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.properties.push(PropertyDef::Field(field));
        self
    }

    /// Add a relationship declaration.
    pub fn with_relationship(mut self, relationship: RelationshipDef) -> Self {
        self.properties.push(PropertyDef::Relationship(relationship));
        self
    }

    /// Shorthand for `with_field(FieldDef::of::<T>(name))`.
    pub fn field<T: FieldType>(self, name: impl Into<String>) -> Self {
        self.with_field(FieldDef::of::<T>(name))
    }

    /// Shorthand for `with_relationship(RelationshipDef::of::<T>(name))`.
    pub fn relationship<T: RelationshipTarget>(self, name: impl Into<String>) -> Self {
        self.with_relationship(RelationshipDef::of::<T>(name))
    }

    /// Get a property by name.
    pub fn get(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Get a field declaration by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        match self.get(name)? {
            PropertyDef::Field(f) => Some(f),
            PropertyDef::Relationship(_) => None,
        }
    }

    /// Get a relationship declaration by name.
    pub fn get_relationship(&self, name: &str) -> Option<&RelationshipDef> {
        match self.get(name)? {
            PropertyDef::Relationship(r) => Some(r),
            PropertyDef::Field(_) => None,
        }
    }

    /// Field declarations in order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.properties.iter().filter_map(|p| match p {
            PropertyDef::Field(f) => Some(f),
            PropertyDef::Relationship(_) => None,
        })
    }

    /// Relationship declarations in order.
    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipDef> {
        self.properties.iter().filter_map(|p| match p {
            PropertyDef::Relationship(r) => Some(r),
            PropertyDef::Field(_) => None,
        })
    }

    /// All property names in order.
    pub fn property_names(&self) -> Vec<&str> {
        self.properties.iter().map(PropertyDef::name).collect()
    }

    /// Reject duplicate property names and invalid relationship declarations.
    pub fn validate(&self) -> Result<(), Error> {
        let mut seen = HashSet::new();
        for property in &self.properties {
            if !seen.insert(property.name()) {
                return Err(Error::Schema {
                    entity: self.name.clone(),
                    reason: format!("duplicate property {}", property.name()),
                });
            }
        }
        for relationship in self.relationships() {
            relationship.validate().map_err(|e| Error::Schema {
                entity: self.name.clone(),
                reason: format!("relationship {}: {e}", relationship.name),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DeleteRule, RelationshipType, StorageAttributeKind};
    use crate::error::MappingError;
    use crate::mapping::{DictionaryReader, DictionaryWriter, Entity};

    #[derive(Debug, Clone, PartialEq)]
    struct Page {
        number: i64,
    }

    impl Entity for Page {
        const NAME: &'static str = "Page";

        fn schema() -> EntitySchema {
            EntitySchema::new(Self::NAME).field::<i64>("number")
        }

        fn write(&self, writer: &mut DictionaryWriter<'_>) {
            writer.field("number", &self.number);
        }

        fn read(reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
            Ok(Self {
                number: reader.field("number")?,
            })
        }
    }

    fn book_schema() -> EntitySchema {
        EntitySchema::new("Book")
            .field::<String>("title")
            .field::<Option<String>>("subtitle")
            .with_relationship(
                RelationshipDef::of::<Vec<Page>>("pages")
                    .with_delete_rule(DeleteRule::Cascade)
                    .with_type(RelationshipType::to_many_unbounded(1)),
            )
    }

    #[test]
    fn test_schema_builder() {
        let schema = book_schema();

        assert_eq!(schema.name, "Book");
        assert_eq!(schema.migration_version, DEFAULT_MIGRATION_VERSION);
        assert_eq!(schema.property_names(), vec!["title", "subtitle", "pages"]);
        assert_eq!(schema.fields().count(), 2);
        assert_eq!(schema.relationships().count(), 1);
        assert!(schema.get("subtitle").unwrap().is_optional());
        assert_eq!(
            schema.get_field("title").unwrap().attribute,
            StorageAttributeKind::String
        );
        assert!(schema.get_field("pages").is_none());
        assert_eq!(schema.get_relationship("pages").unwrap().target, "Page");
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_duplicate_property_rejected() {
        let schema = book_schema().field::<i64>("title");
        assert!(matches!(schema.validate(), Err(Error::Schema { .. })));
    }

    #[test]
    fn test_invalid_relationship_rejected() {
        let schema = EntitySchema::new("Book").with_relationship(
            RelationshipDef::of::<Vec<Page>>("pages").with_type(RelationshipType::to_many(5, 2)),
        );
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_schema_serializes() {
        let json = serde_json::to_value(book_schema()).unwrap();
        assert_eq!(json["properties"][0]["kind"], "field");
        assert_eq!(json["properties"][2]["kind"], "relationship");
        assert_eq!(json["properties"][2]["delete_rule"], "cascade");
    }
}
