//! Registry of entity schemas.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::entity::EntitySchema;
use super::relation::RelationshipDef;
use crate::error::{Error, MappingError};
use crate::mapping::Entity;

/// Entity schemas known to a graph or context, keyed by entity name.
#[derive(Debug, Default)]
pub struct Catalog {
    schemas: RwLock<HashMap<String, EntitySchema>>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `E` and, transitively, every entity type it relates to.
    ///
    /// Already registered names are left as they are, which also stops
    /// recursion through cyclic schemas. Every new schema is validated before
    /// any is inserted, so a failure registers nothing.
    pub fn register<E: Entity>(&self) -> Result<(), Error> {
        let mut schemas = self.schemas.write();
        let mut pending = vec![E::schema()];
        let mut found: HashMap<String, EntitySchema> = HashMap::new();

        while let Some(schema) = pending.pop() {
            if schemas.contains_key(&schema.name) || found.contains_key(&schema.name) {
                continue;
            }
            pending.extend(
                schema
                    .relationships()
                    .filter(|r| !schemas.contains_key(&r.target) && !found.contains_key(&r.target))
                    .map(|r| (r.target_schema)()),
            );
            found.insert(schema.name.clone(), schema);
        }

        for schema in found.values() {
            schema.validate()?;
        }
        for (name, schema) in found {
            tracing::trace!(entity = %name, "registered entity schema");
            schemas.insert(name, schema);
        }
        Ok(())
    }

    /// Register a single schema, replacing any schema of the same name.
    pub fn register_schema(&self, schema: EntitySchema) -> Result<(), Error> {
        schema.validate()?;
        self.schemas.write().insert(schema.name.clone(), schema);
        Ok(())
    }

    /// Get a schema by entity name.
    pub fn get(&self, entity: &str) -> Option<EntitySchema> {
        self.schemas.read().get(entity).cloned()
    }

    /// Get a schema or fail with [`MappingError::UnknownEntity`].
    pub fn require(&self, entity: &str) -> Result<EntitySchema, MappingError> {
        self.get(entity)
            .ok_or_else(|| MappingError::UnknownEntity(entity.to_string()))
    }

    /// Check if an entity type is registered.
    pub fn contains(&self, entity: &str) -> bool {
        self.schemas.read().contains_key(entity)
    }

    /// Registered entity names, sorted.
    pub fn entity_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Relationships declared by any entity that point at `entity`,
    /// paired with the owning entity name.
    pub fn relationships_to(&self, entity: &str) -> Vec<(String, RelationshipDef)> {
        let schemas = self.schemas.read();
        let mut found: Vec<(String, RelationshipDef)> = schemas
            .values()
            .flat_map(|schema| {
                schema
                    .relationships()
                    .filter(|r| r.target == entity)
                    .map(|r| (schema.name.clone(), r.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        found.sort_by(|a, b| (&a.0, &a.1.name).cmp(&(&b.0, &b.1.name)));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DeleteRule, Relationship};
    use crate::mapping::{DictionaryReader, DictionaryWriter};

    // Folder <-> Note form a cycle through their relationships.
    #[derive(Debug, Clone, PartialEq)]
    struct Folder {
        notes: Relationship<Vec<Note>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        folder: Relationship<Option<Folder>>,
    }

    impl Entity for Folder {
        const NAME: &'static str = "Folder";

        fn schema() -> EntitySchema {
            EntitySchema::new(Self::NAME).with_relationship(
                RelationshipDef::of::<Vec<Note>>("notes")
                    .with_delete_rule(DeleteRule::Cascade)
                    .with_inverse("folder"),
            )
        }

        fn write(&self, writer: &mut DictionaryWriter<'_>) {
            writer.relationship("notes", &self.notes);
        }

        fn read(reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
            Ok(Self {
                notes: reader.relationship("notes")?,
            })
        }
    }

    impl Entity for Note {
        const NAME: &'static str = "Note";

        fn schema() -> EntitySchema {
            EntitySchema::new(Self::NAME).with_relationship(
                RelationshipDef::of::<Option<Folder>>("folder")
                    .with_delete_rule(DeleteRule::Nullify)
                    .with_inverse("notes"),
            )
        }

        fn write(&self, writer: &mut DictionaryWriter<'_>) {
            writer.relationship("folder", &self.folder);
        }

        fn read(reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
            Ok(Self {
                folder: reader.relationship("folder")?,
            })
        }
    }

    #[test]
    fn test_register_transitive_and_cyclic() {
        let catalog = Catalog::new();
        catalog.register::<Folder>().unwrap();

        assert_eq!(catalog.entity_names(), vec!["Folder", "Note"]);
        assert!(catalog.contains("Note"));

        // Registering again is a no-op.
        catalog.register::<Note>().unwrap();
        assert_eq!(catalog.entity_names().len(), 2);
    }

    #[test]
    fn test_relationships_to() {
        let catalog = Catalog::new();
        catalog.register::<Note>().unwrap();

        let inbound = catalog.relationships_to("Note");
        assert_eq!(inbound.len(), 1);
        assert_eq!(inbound[0].0, "Folder");
        assert_eq!(inbound[0].1.name, "notes");
    }

    #[test]
    fn test_require_unknown() {
        let catalog = Catalog::new();
        assert_eq!(
            catalog.require("Ghost").unwrap_err(),
            MappingError::UnknownEntity("Ghost".into())
        );
    }

    #[test]
    fn test_register_schema_validates() {
        let catalog = Catalog::new();
        let bad = EntitySchema::new("Dup").field::<i64>("a").field::<i64>("a");
        assert!(catalog.register_schema(bad).is_err());
        assert!(!catalog.contains("Dup"));
    }

    #[test]
    fn test_register_is_all_or_nothing() {
        #[derive(Debug)]
        struct Broken;

        impl Entity for Broken {
            const NAME: &'static str = "Broken";

            fn schema() -> EntitySchema {
                EntitySchema::new(Self::NAME).field::<i64>("a").field::<i64>("a")
            }

            fn write(&self, _writer: &mut DictionaryWriter<'_>) {}

            fn read(_reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
                Ok(Broken)
            }
        }

        #[derive(Debug)]
        struct Shelf;

        impl Entity for Shelf {
            const NAME: &'static str = "Shelf";

            fn schema() -> EntitySchema {
                EntitySchema::new(Self::NAME).relationship::<Option<Broken>>("broken")
            }

            fn write(&self, _writer: &mut DictionaryWriter<'_>) {}

            fn read(_reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
                Ok(Shelf)
            }
        }

        let catalog = Catalog::new();
        assert!(catalog.register::<Shelf>().is_err());
        assert!(!catalog.contains("Shelf"));
        assert!(!catalog.contains("Broken"));
        assert!(catalog.entity_names().is_empty());
    }
}
