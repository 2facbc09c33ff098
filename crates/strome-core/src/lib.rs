//! Strome Core - entity descriptors, dictionary mapping and delete propagation.
//!
//! Entity types declare their fields and relationships once, convert to and
//! from [`strome_proto::Mapping`] dictionaries, and persist through a
//! [`Store`]. Relationships carry a [`DeleteRule`] and a
//! [`RelationshipType`] that the [`GraphMutator`] applies when an entity is
//! deleted from an [`EntityGraph`].

pub mod catalog;
pub mod context;
pub mod error;
pub mod graph;
pub mod mapping;
pub mod store;

pub use catalog::{
    Binary, Catalog, DeleteRule, EntitySchema, FieldDef, FieldType, PropertyDef, Relationship,
    RelationshipDef, RelationshipTarget, RelationshipType, Shape, StorageAttributeKind,
};
pub use context::Context;
pub use error::{CardinalityError, CascadeError, ConversionError, Error, MappingError, StoreError};
pub use graph::{DeleteOutcome, EntityGraph, GraphMutator, GraphNode, RelationshipSlot, SharedGraph};
pub use mapping::{DictionaryReader, DictionaryWriter, Entity, Projection};
pub use store::{
    Criterion, EntityId, EntityKey, MemoryStore, SledStore, Store, StoreConfig, StoredRecord,
};

/// Re-export value types.
pub use strome_proto as proto;
