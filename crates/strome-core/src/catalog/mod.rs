//! Entity catalog.
//!
//! Field and relationship descriptors, entity schemas, and the registry
//! that resolves relationship targets by name.

mod catalog;
mod entity;
mod field;
mod relation;
mod types;

pub use catalog::Catalog;
pub use entity::{EntitySchema, PropertyDef, DEFAULT_MIGRATION_VERSION};
pub use field::{Binary, FieldDef, FieldType};
pub use relation::{
    DeleteRule, Relationship, RelationshipDef, RelationshipTarget, RelationshipType, Shape,
};
pub use types::StorageAttributeKind;
