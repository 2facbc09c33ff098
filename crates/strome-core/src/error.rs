//! Core error types.

use strome_proto::ValueKind;
use thiserror::Error;

use crate::catalog::{DeleteRule, RelationshipType};
use crate::store::{EntityId, EntityKey};

/// Errors from the persistence core.
#[derive(Debug, Error)]
pub enum Error {
    /// Field decode error.
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Dictionary decode error.
    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Relationship bound error.
    #[error("cardinality error: {0}")]
    Cardinality(#[from] CardinalityError),

    /// Delete propagation error.
    #[error("cascade error: {0}")]
    Cascade(#[from] CascadeError),

    /// Backing store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid entity schema.
    #[error("invalid schema for {entity}: {reason}")]
    Schema {
        /// Entity name.
        entity: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A key was used with an entity type it does not belong to.
    #[error("key {key} does not belong to entity {expected}")]
    EntityMismatch {
        /// Entity type the caller asked for.
        expected: String,
        /// The offending key.
        key: EntityKey,
    },

    /// A stored record was written by a newer shape of the entity.
    #[error("{entity} record has migration version {stored}, newest supported is {supported}")]
    UnsupportedVersion {
        /// Entity name.
        entity: String,
        /// Version recorded in the store.
        stored: u32,
        /// Version declared by the entity type.
        supported: u32,
    },
}

/// A field value did not match the statically expected kind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Wrong variant tag.
    #[error("expected {expected}, found {found}")]
    KindMismatch {
        /// Kind the property type decodes from.
        expected: ValueKind,
        /// Kind present in the dictionary.
        found: ValueKind,
    },

    /// Correct tag but the payload does not fit the native type.
    #[error("value {value} does not fit {target}")]
    OutOfRange {
        /// Rendered value.
        value: String,
        /// Native type name.
        target: &'static str,
    },

    /// An element of a sequence failed to convert.
    #[error("element {index}: {source}")]
    Element {
        /// Position in the sequence.
        index: usize,
        /// Underlying failure.
        source: Box<ConversionError>,
    },

    /// An entry of a nested mapping failed to convert.
    #[error("entry {key:?}: {source}")]
    Entry {
        /// Mapping key.
        key: String,
        /// Underlying failure.
        source: Box<ConversionError>,
    },
}

impl ConversionError {
    /// Create a kind mismatch error.
    pub fn mismatch(expected: ValueKind, found: ValueKind) -> Self {
        ConversionError::KindMismatch { expected, found }
    }
}

/// A dictionary could not be turned into an entity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    /// A required property is missing or null.
    #[error("{entity}.{key} is required but missing")]
    MissingKey {
        /// Entity name.
        entity: String,
        /// Property name.
        key: String,
    },

    /// A field value failed to convert.
    #[error("{entity}.{key}: {source}")]
    Field {
        /// Entity name.
        entity: String,
        /// Property name.
        key: String,
        /// Underlying failure.
        source: ConversionError,
    },

    /// A relationship value has the wrong shape (single vs. sequence).
    #[error("{entity}.{key}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Entity name.
        entity: String,
        /// Property name.
        key: String,
        /// Kind the declared cardinality requires.
        expected: ValueKind,
        /// Kind present in the dictionary.
        found: ValueKind,
    },

    /// A relationship value violates its declared bounds.
    #[error("{entity}.{key}: {source}")]
    Cardinality {
        /// Entity name.
        entity: String,
        /// Property name.
        key: String,
        /// Underlying failure.
        source: CardinalityError,
    },

    /// A relationship instance sets a delete rule other than the declared one.
    #[error("{entity}.{key}: declared delete rule {declared:?}, instance sets {found:?}")]
    RuleConflict {
        /// Entity name.
        entity: String,
        /// Relationship name.
        key: String,
        /// Rule in the schema.
        declared: DeleteRule,
        /// Rule on the instance.
        found: DeleteRule,
    },

    /// A relationship instance sets a cardinality other than the declared one.
    #[error("{entity}.{key}: declared type {declared:?}, instance sets {found:?}")]
    TypeConflict {
        /// Entity name.
        entity: String,
        /// Relationship name.
        key: String,
        /// Type in the schema.
        declared: RelationshipType,
        /// Type on the instance.
        found: RelationshipType,
    },

    /// A related entity failed to decode.
    #[error("{entity}.{key} -> {source}")]
    Nested {
        /// Owning entity name.
        entity: String,
        /// Relationship name, with the element index for sequences.
        key: String,
        /// Failure inside the related entity.
        source: Box<MappingError>,
    },

    /// The property is not declared on the entity.
    #[error("{entity} declares no property {key}")]
    UndeclaredProperty {
        /// Entity name.
        entity: String,
        /// Property name.
        key: String,
    },

    /// The entity type is not registered in the catalog.
    #[error("unknown entity type {0}")]
    UnknownEntity(String),

    /// Graph node identity is unknown.
    #[error("no graph node with id {0}")]
    UnknownNode(EntityId),

    /// A graph node identity is already taken.
    #[error("graph node {0} already exists")]
    DuplicateNode(EntityId),

    /// A graph node holds a different entity type than expected.
    #[error("node {id} is a {found}, not a {expected}")]
    WrongEntity {
        /// Entity name the caller asked for.
        expected: String,
        /// Entity name of the node.
        found: String,
        /// Node identity.
        id: EntityId,
    },

    /// A relationship points at a node that no longer exists.
    #[error("{entity}.{key} points at missing node {id}")]
    DanglingReference {
        /// Owning entity name.
        entity: String,
        /// Relationship name.
        key: String,
        /// Missing identity.
        id: EntityId,
    },

    /// A nested dictionary cannot be derived from a cyclic subgraph.
    #[error("cycle through {entity} {id}")]
    CyclicReference {
        /// Entity name where the cycle closes.
        entity: String,
        /// Node identity where the cycle closes.
        id: EntityId,
    },
}

/// A relationship value or declaration breaks its cardinality.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardinalityError {
    /// Related count outside `[minimum, maximum]`.
    #[error("{count} related entities outside bounds [{minimum}, {}]", display_max(.maximum))]
    Violation {
        /// Number of related entities.
        count: usize,
        /// Lower bound.
        minimum: usize,
        /// Upper bound, `None` if unbounded.
        maximum: Option<usize>,
    },

    /// Declared bounds are inverted.
    #[error("invalid bounds [{minimum}, {maximum}]")]
    InvalidBounds {
        /// Lower bound.
        minimum: usize,
        /// Upper bound.
        maximum: usize,
    },

    /// Declared type disagrees with the value shape.
    #[error("{declared} relationship cannot hold a {shape} value")]
    ShapeMismatch {
        /// Declared relationship type name.
        declared: &'static str,
        /// Shape of the wrapped value.
        shape: &'static str,
    },
}

fn display_max(maximum: &Option<usize>) -> String {
    match maximum {
        Some(max) => max.to_string(),
        None => "unbounded".to_string(),
    }
}

/// Errors raised while propagating a delete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CascadeError {
    /// A `deny` relationship still holds related entities.
    #[error("cannot delete {entity} {id}: {relationship} holds {count} related entities")]
    DeleteDenied {
        /// Entity owning the deny relationship.
        entity: String,
        /// Identity of that entity.
        id: EntityId,
        /// Relationship name.
        relationship: String,
        /// Number of related entities.
        count: usize,
    },

    /// The entity to delete is not in the graph.
    #[error("entity {0} not found in graph")]
    UnknownEntity(EntityId),
}

/// Errors raised by a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record under the key.
    #[error("record {0} not found")]
    NotFound(EntityKey),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage engine failure.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Dictionary encoding failure.
    #[error("encoding error: {0}")]
    Encoding(#[from] strome_proto::Error),

    /// Record envelope could not be read or written.
    #[error("corrupt record: {0}")]
    Record(String),

    /// Stored key could not be decoded.
    #[error("invalid key format")]
    InvalidKey,

    /// The store cannot interpret a filter expression.
    #[error("unsupported criterion: {0}")]
    UnsupportedCriterion(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_messages() {
        let err = CardinalityError::Violation {
            count: 3,
            minimum: 1,
            maximum: Some(2),
        };
        assert_eq!(err.to_string(), "3 related entities outside bounds [1, 2]");

        let err = CardinalityError::Violation {
            count: 0,
            minimum: 1,
            maximum: None,
        };
        assert_eq!(err.to_string(), "0 related entities outside bounds [1, unbounded]");
    }

    #[test]
    fn test_nested_mapping_message() {
        let err = MappingError::Nested {
            entity: "User".into(),
            key: "addresses[1]".into(),
            source: Box::new(MappingError::MissingKey {
                entity: "Address".into(),
                key: "city".into(),
            }),
        };
        assert_eq!(
            err.to_string(),
            "User.addresses[1] -> Address.city is required but missing"
        );
    }
}
