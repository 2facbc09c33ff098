//! Relationship descriptors between entities.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use strome_proto::{FieldValue, ValueKind};

use super::entity::EntitySchema;
use crate::error::{CardinalityError, MappingError};
use crate::mapping::Entity;

/// What happens to related entities when the owning entity is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteRule {
    /// Leave related entities untouched.
    #[default]
    NoAction,
    /// Clear the reciprocal link on related entities.
    Nullify,
    /// Delete related entities as well.
    Cascade,
    /// Refuse the delete while related entities exist.
    Deny,
}

/// Cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Inferred from the wrapped value's shape, no bound checks.
    #[default]
    Auto,
    /// Exactly one related entity (or none, if optional).
    ToOne,
    /// A sequence of related entities within bounds.
    ToMany {
        /// Lower bound on the related count.
        minimum: usize,
        /// Upper bound on the related count, `None` if unbounded.
        maximum: Option<usize>,
    },
}

impl RelationshipType {
    /// Bounded to-many relationship.
    pub fn to_many(minimum: usize, maximum: usize) -> Self {
        RelationshipType::ToMany {
            minimum,
            maximum: Some(maximum),
        }
    }

    /// To-many relationship without an upper bound.
    pub fn to_many_unbounded(minimum: usize) -> Self {
        RelationshipType::ToMany {
            minimum,
            maximum: None,
        }
    }

    /// Reject inverted bounds.
    pub fn validate_bounds(&self) -> Result<(), CardinalityError> {
        match *self {
            RelationshipType::ToMany {
                minimum,
                maximum: Some(maximum),
            } if minimum > maximum => Err(CardinalityError::InvalidBounds { minimum, maximum }),
            _ => Ok(()),
        }
    }

    /// Check a related count against the bounds. Only `ToMany` has bounds.
    pub fn check_count(&self, count: usize) -> Result<(), CardinalityError> {
        match *self {
            RelationshipType::ToMany { minimum, maximum } => {
                if count < minimum || maximum.is_some_and(|max| count > max) {
                    Err(CardinalityError::Violation {
                        count,
                        minimum,
                        maximum,
                    })
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    /// Check the declared type against a value shape.
    pub fn check_shape(&self, shape: Shape) -> Result<(), CardinalityError> {
        match (self, shape) {
            (RelationshipType::ToOne, Shape::Many) => Err(CardinalityError::ShapeMismatch {
                declared: "to-one",
                shape: Shape::Many.as_str(),
            }),
            (RelationshipType::ToMany { .. }, Shape::One) => {
                Err(CardinalityError::ShapeMismatch {
                    declared: "to-many",
                    shape: Shape::One.as_str(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Whether a relationship holds one entity or a sequence of entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// A single related entity, encoded as a nested mapping.
    One,
    /// Related entities encoded as a sequence of mappings.
    Many,
}

impl Shape {
    fn as_str(&self) -> &'static str {
        match self {
            Shape::One => "singular",
            Shape::Many => "sequence",
        }
    }

    /// The dictionary kind this shape is encoded as.
    pub fn value_kind(&self) -> ValueKind {
        match self {
            Shape::One => ValueKind::Mapping,
            Shape::Many => ValueKind::Sequence,
        }
    }
}

/// A property value made of related entities.
///
/// Implemented for `E`, `Option<E>`, `Vec<E>` and `Option<Vec<E>>` where
/// `E: Entity`.
pub trait RelationshipTarget: Sized {
    /// The related entity type.
    type Target: Entity;

    /// Singular or sequence.
    const SHAPE: Shape;

    /// Whether the relationship may be absent.
    const OPTIONAL: bool = false;

    /// The related entities, in order.
    fn related(&self) -> Vec<&Self::Target>;

    /// Rebuild from decoded related entities. `None` if the count cannot fit.
    fn from_related(related: Vec<Self::Target>) -> Option<Self>;

    /// Whether this value is "no value" rather than an empty relationship.
    fn is_absent(&self) -> bool {
        false
    }

    /// The value a missing key decodes to, if the type allows absence.
    fn absent() -> Option<Self> {
        None
    }

    /// Number of related entities.
    fn related_count(&self) -> usize {
        self.related().len()
    }

    /// Encode as a nested mapping, a sequence of mappings, or null.
    fn to_field_value(&self) -> FieldValue {
        if self.is_absent() {
            return FieldValue::Null;
        }
        let related = self.related();
        match Self::SHAPE {
            Shape::One => related
                .first()
                .map(|e| FieldValue::Mapping(e.to_dictionary()))
                .unwrap_or(FieldValue::Null),
            Shape::Many => FieldValue::Sequence(
                related
                    .into_iter()
                    .map(|e| FieldValue::Mapping(e.to_dictionary()))
                    .collect(),
            ),
        }
    }

    /// Decode a non-null dictionary value stored under `owner.key`.
    fn decode(owner: &str, key: &str, value: &FieldValue) -> Result<Self, MappingError> {
        let shape_error = |found: ValueKind, key: String| MappingError::ShapeMismatch {
            entity: owner.to_string(),
            key,
            expected: ValueKind::Mapping,
            found,
        };
        let decode_one = |value: &FieldValue, key: String| match value {
            FieldValue::Mapping(map) => {
                Self::Target::from_dictionary(map).map_err(|e| MappingError::Nested {
                    entity: owner.to_string(),
                    key,
                    source: Box::new(e),
                })
            }
            other => Err(shape_error(other.kind(), key)),
        };

        let related = match (Self::SHAPE, value) {
            (Shape::One, FieldValue::Mapping(_)) => vec![decode_one(value, key.to_string())?],
            (Shape::Many, FieldValue::Sequence(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| decode_one(item, format!("{key}[{i}]")))
                .collect::<Result<Vec<_>, _>>()?,
            (shape, other) => {
                return Err(MappingError::ShapeMismatch {
                    entity: owner.to_string(),
                    key: key.to_string(),
                    expected: shape.value_kind(),
                    found: other.kind(),
                })
            }
        };

        let count = related.len();
        Self::from_related(related).ok_or_else(|| MappingError::Cardinality {
            entity: owner.to_string(),
            key: key.to_string(),
            source: CardinalityError::Violation {
                count,
                minimum: 1,
                maximum: Some(1),
            },
        })
    }
}

impl<E: Entity> RelationshipTarget for E {
    type Target = E;
    const SHAPE: Shape = Shape::One;

    fn related(&self) -> Vec<&E> {
        vec![self]
    }

    fn from_related(mut related: Vec<E>) -> Option<Self> {
        if related.len() == 1 {
            related.pop()
        } else {
            None
        }
    }
}

impl<E: Entity> RelationshipTarget for Option<E> {
    type Target = E;
    const SHAPE: Shape = Shape::One;
    const OPTIONAL: bool = true;

    fn related(&self) -> Vec<&E> {
        self.iter().collect()
    }

    fn from_related(mut related: Vec<E>) -> Option<Self> {
        match related.len() {
            0 => Some(None),
            1 => related.pop().map(Some),
            _ => None,
        }
    }

    fn is_absent(&self) -> bool {
        self.is_none()
    }

    fn absent() -> Option<Self> {
        Some(None)
    }
}

impl<E: Entity> RelationshipTarget for Vec<E> {
    type Target = E;
    const SHAPE: Shape = Shape::Many;

    fn related(&self) -> Vec<&E> {
        self.iter().collect()
    }

    fn from_related(related: Vec<E>) -> Option<Self> {
        Some(related)
    }
}

impl<E: Entity> RelationshipTarget for Option<Vec<E>> {
    type Target = E;
    const SHAPE: Shape = Shape::Many;
    const OPTIONAL: bool = true;

    fn related(&self) -> Vec<&E> {
        self.iter().flatten().collect()
    }

    fn from_related(related: Vec<E>) -> Option<Self> {
        Some(Some(related))
    }

    fn is_absent(&self) -> bool {
        self.is_none()
    }

    fn absent() -> Option<Self> {
        Some(None)
    }
}

/// Declaration of one relationship within an entity schema.
#[derive(Clone, Serialize)]
pub struct RelationshipDef {
    /// Property name (dictionary key).
    pub name: String,
    /// Related entity type name.
    pub target: String,
    /// Rule applied to related entities when the owner is deleted.
    pub delete_rule: DeleteRule,
    /// Declared cardinality.
    pub relationship_type: RelationshipType,
    /// Name of the reciprocal relationship on the target, if any.
    pub inverse: Option<String>,
    /// Whether the relationship may be absent.
    pub optional: bool,
    /// Singular or sequence.
    pub shape: Shape,
    /// Schema of the related entity type.
    #[serde(skip)]
    pub target_schema: fn() -> EntitySchema,
}

impl RelationshipDef {
    /// Declare a relationship holding a value of type `T`.
    ///
    /// Defaults to `noAction` and `auto`, like [`Relationship::new`].
    pub fn of<T: RelationshipTarget>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: T::Target::NAME.to_string(),
            delete_rule: DeleteRule::NoAction,
            relationship_type: RelationshipType::Auto,
            inverse: None,
            optional: T::OPTIONAL,
            shape: T::SHAPE,
            target_schema: T::Target::schema,
        }
    }

    /// Set the delete rule.
    pub fn with_delete_rule(mut self, rule: DeleteRule) -> Self {
        self.delete_rule = rule;
        self
    }

    /// Set the relationship type.
    pub fn with_type(mut self, relationship_type: RelationshipType) -> Self {
        self.relationship_type = relationship_type;
        self
    }

    /// Name the reciprocal relationship on the target entity.
    pub fn with_inverse(mut self, inverse: impl Into<String>) -> Self {
        self.inverse = Some(inverse.into());
        self
    }

    /// Check that the declared type fits the value shape and has sane bounds.
    pub fn validate(&self) -> Result<(), CardinalityError> {
        self.relationship_type.validate_bounds()?;
        self.relationship_type.check_shape(self.shape)
    }
}

impl fmt::Debug for RelationshipDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationshipDef")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("delete_rule", &self.delete_rule)
            .field("relationship_type", &self.relationship_type)
            .field("inverse", &self.inverse)
            .field("optional", &self.optional)
            .field("shape", &self.shape)
            .finish()
    }
}

impl PartialEq for RelationshipDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.target == other.target
            && self.delete_rule == other.delete_rule
            && self.relationship_type == other.relationship_type
            && self.inverse == other.inverse
            && self.optional == other.optional
            && self.shape == other.shape
    }
}

/// A relationship property: related entities plus their delete rule and cardinality.
///
/// The owning schema's [`RelationshipDef`] is authoritative. A rule or type
/// set on the instance only restates it: decoding takes both from the
/// declaration, [`Entity::to_checked_dictionary`] rejects an instance that
/// disagrees, and equality compares the related value alone.
///
/// Values are replaced whole; every constructor and [`Relationship::set`]
/// re-validates the cardinality set on the instance.
#[derive(Debug, Clone)]
pub struct Relationship<T> {
    value: T,
    delete_rule: Option<DeleteRule>,
    relationship_type: Option<RelationshipType>,
}

impl<T: RelationshipTarget> Relationship<T> {
    /// Wrap a value that inherits its rule and cardinality from the declaration.
    pub fn new(value: T) -> Self {
        Self {
            value,
            delete_rule: None,
            relationship_type: None,
        }
    }

    /// Explicit to-one relationship.
    pub fn to_one(value: T) -> Result<Self, CardinalityError> {
        Self::new(value).with_type(RelationshipType::ToOne)
    }

    /// Explicit bounded to-many relationship.
    pub fn to_many(value: T, minimum: usize, maximum: usize) -> Result<Self, CardinalityError> {
        Self::new(value).with_type(RelationshipType::to_many(minimum, maximum))
    }

    /// Wrap a value using a schema declaration's rule and cardinality.
    pub fn from_def(def: &RelationshipDef, value: T) -> Result<Self, CardinalityError> {
        Self::new(value)
            .with_delete_rule(def.delete_rule)
            .with_type(def.relationship_type)
    }

    /// Set the delete rule.
    pub fn with_delete_rule(mut self, rule: DeleteRule) -> Self {
        self.delete_rule = Some(rule);
        self
    }

    /// Set the relationship type and validate the current value against it.
    pub fn with_type(mut self, relationship_type: RelationshipType) -> Result<Self, CardinalityError> {
        self.relationship_type = Some(relationship_type);
        self.validate()?;
        Ok(self)
    }

    /// Validate the value against the cardinality set on the instance.
    ///
    /// An absent optional value is not bound-checked.
    pub fn validate(&self) -> Result<(), CardinalityError> {
        let relationship_type = self.relationship_type();
        relationship_type.validate_bounds()?;
        relationship_type.check_shape(T::SHAPE)?;
        if self.value.is_absent() {
            return Ok(());
        }
        relationship_type.check_count(self.value.related_count())
    }

    /// Check the instance against the declaration it is written under.
    ///
    /// A rule or type set on the instance must equal the declared one, and
    /// the value must fit the declared bounds.
    pub fn check_declaration(&self, owner: &str, def: &RelationshipDef) -> Result<(), MappingError> {
        if let Some(found) = self.delete_rule.filter(|rule| *rule != def.delete_rule) {
            return Err(MappingError::RuleConflict {
                entity: owner.to_string(),
                key: def.name.clone(),
                declared: def.delete_rule,
                found,
            });
        }
        if let Some(found) = self
            .relationship_type
            .filter(|relationship_type| *relationship_type != def.relationship_type)
        {
            return Err(MappingError::TypeConflict {
                entity: owner.to_string(),
                key: def.name.clone(),
                declared: def.relationship_type,
                found,
            });
        }
        if self.value.is_absent() {
            return Ok(());
        }
        def.relationship_type
            .check_count(self.value.related_count())
            .map_err(|source| MappingError::Cardinality {
                entity: owner.to_string(),
                key: def.name.clone(),
                source,
            })
    }

    /// Replace the wrapped value. The old value is kept if the new one is invalid.
    pub fn set(&mut self, value: T) -> Result<(), CardinalityError> {
        let previous = std::mem::replace(&mut self.value, value);
        if let Err(e) = self.validate() {
            self.value = previous;
            return Err(e);
        }
        Ok(())
    }

    /// The wrapped value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Unwrap the value.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// The delete rule set on the instance, `noAction` if none was set.
    pub fn delete_rule(&self) -> DeleteRule {
        self.delete_rule.unwrap_or_default()
    }

    /// The cardinality set on the instance, `auto` if none was set.
    pub fn relationship_type(&self) -> RelationshipType {
        self.relationship_type.unwrap_or_default()
    }

    /// Encode the wrapped value.
    pub fn to_field_value(&self) -> FieldValue {
        self.value.to_field_value()
    }
}

impl<T: PartialEq> PartialEq for Relationship<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Deref for Relationship<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldDef;
    use crate::mapping::{DictionaryReader, DictionaryWriter};

    #[derive(Debug, Clone, PartialEq)]
    struct Tag {
        label: String,
    }

    impl Tag {
        fn new(label: &str) -> Self {
            Self {
                label: label.to_string(),
            }
        }
    }

    impl Entity for Tag {
        const NAME: &'static str = "Tag";

        fn schema() -> EntitySchema {
            EntitySchema::new(Self::NAME).with_field(FieldDef::of::<String>("label"))
        }

        fn write(&self, writer: &mut DictionaryWriter<'_>) {
            writer.field("label", &self.label);
        }

        fn read(reader: &DictionaryReader<'_>) -> Result<Self, MappingError> {
            Ok(Self {
                label: reader.field("label")?,
            })
        }
    }

    fn tags(n: usize) -> Vec<Tag> {
        (0..n).map(|i| Tag::new(&format!("t{i}"))).collect()
    }

    #[test]
    fn test_defaults() {
        let rel = Relationship::new(Tag::new("a"));
        assert_eq!(rel.delete_rule(), DeleteRule::NoAction);
        assert_eq!(rel.relationship_type(), RelationshipType::Auto);
        assert_eq!(rel.label, "a");
    }

    #[test]
    fn test_to_many_bounds() {
        assert_eq!(
            Relationship::to_many(tags(0), 1, 2).unwrap_err(),
            CardinalityError::Violation {
                count: 0,
                minimum: 1,
                maximum: Some(2)
            }
        );
        assert!(Relationship::to_many(tags(1), 1, 2).is_ok());
        assert!(Relationship::to_many(tags(2), 1, 2).is_ok());
        assert!(matches!(
            Relationship::to_many(tags(3), 1, 2),
            Err(CardinalityError::Violation { count: 3, .. })
        ));
    }

    #[test]
    fn test_auto_skips_bounds() {
        let rel = Relationship::new(tags(50));
        assert!(rel.validate().is_ok());
        assert_eq!(rel.related_count(), 50);
    }

    #[test]
    fn test_unbounded_to_many() {
        let rel = Relationship::new(tags(10))
            .with_type(RelationshipType::to_many_unbounded(1))
            .unwrap();
        assert!(rel.relationship_type().check_count(0).is_err());
    }

    #[test]
    fn test_inverted_bounds() {
        assert_eq!(
            Relationship::to_many(tags(1), 3, 1).unwrap_err(),
            CardinalityError::InvalidBounds {
                minimum: 3,
                maximum: 1
            }
        );
    }

    #[test]
    fn test_shape_mismatch() {
        assert!(matches!(
            Relationship::to_one(tags(1)),
            Err(CardinalityError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            Relationship::new(Tag::new("a")).with_type(RelationshipType::to_many(0, 1)),
            Err(CardinalityError::ShapeMismatch { .. })
        ));
        assert!(Relationship::to_one(Tag::new("a")).is_ok());
    }

    #[test]
    fn test_absent_optional_skips_bounds() {
        let rel = Relationship::to_many(None::<Vec<Tag>>, 1, 2).unwrap();
        assert!(rel.is_none());
        assert_eq!(rel.to_field_value(), FieldValue::Null);

        assert!(Relationship::to_many(Some(tags(0)), 1, 2).is_err());
    }

    #[test]
    fn test_set_keeps_previous_on_violation() {
        let mut rel = Relationship::to_many(tags(1), 1, 2).unwrap();
        assert!(rel.set(tags(3)).is_err());
        assert_eq!(rel.len(), 1);
        rel.set(tags(2)).unwrap();
        assert_eq!(rel.len(), 2);
    }

    #[test]
    fn test_encode_shapes() {
        let one = Relationship::new(Tag::new("a")).to_field_value();
        assert_eq!(one.kind(), ValueKind::Mapping);

        let many = Relationship::new(tags(2)).to_field_value();
        assert_eq!(many.as_sequence().map(|s| s.len()), Some(2));

        let empty = Relationship::new(Some(Vec::<Tag>::new())).to_field_value();
        assert_eq!(empty, FieldValue::Sequence(vec![]));
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let single = Tag::new("a").to_dictionary();
        let err = Vec::<Tag>::decode("Post", "tags", &FieldValue::Mapping(single)).unwrap_err();
        assert_eq!(
            err,
            MappingError::ShapeMismatch {
                entity: "Post".into(),
                key: "tags".into(),
                expected: ValueKind::Sequence,
                found: ValueKind::Mapping,
            }
        );

        let seq = FieldValue::Sequence(vec![FieldValue::Mapping(Tag::new("a").to_dictionary())]);
        assert!(matches!(
            Tag::decode("Post", "tag", &seq),
            Err(MappingError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_nested_error_path() {
        let seq = FieldValue::Sequence(vec![
            FieldValue::Mapping(Tag::new("a").to_dictionary()),
            FieldValue::Mapping(Default::default()),
        ]);
        let err = Vec::<Tag>::decode("Post", "tags", &seq).unwrap_err();
        assert!(matches!(err, MappingError::Nested { ref key, .. } if key == "tags[1]"));
    }

    #[test]
    fn test_def_defaults_and_validation() {
        let def = RelationshipDef::of::<Vec<Tag>>("tags");
        assert_eq!(def.target, "Tag");
        assert_eq!(def.shape, Shape::Many);
        assert_eq!(def.delete_rule, DeleteRule::NoAction);
        assert!(!def.optional);
        assert!(def.validate().is_ok());

        let bad = RelationshipDef::of::<Tag>("tag").with_type(RelationshipType::to_many(0, 3));
        assert!(bad.validate().is_err());

        let from_def = Relationship::from_def(
            &RelationshipDef::of::<Vec<Tag>>("tags")
                .with_delete_rule(DeleteRule::Cascade)
                .with_type(RelationshipType::to_many(1, 2)),
            tags(2),
        )
        .unwrap();
        assert_eq!(from_def.delete_rule(), DeleteRule::Cascade);
    }

    #[test]
    fn test_equality_ignores_instance_metadata() {
        let plain = Relationship::new(tags(2));
        let declared = Relationship::new(tags(2))
            .with_delete_rule(DeleteRule::Cascade)
            .with_type(RelationshipType::to_many(1, 2))
            .unwrap();
        assert_eq!(plain, declared);
        assert_ne!(plain, Relationship::new(tags(1)));
    }

    #[test]
    fn test_check_declaration() {
        let def = RelationshipDef::of::<Vec<Tag>>("tags")
            .with_delete_rule(DeleteRule::Cascade)
            .with_type(RelationshipType::to_many(1, 2));

        assert!(Relationship::new(tags(1)).check_declaration("Post", &def).is_ok());
        assert!(Relationship::from_def(&def, tags(2))
            .unwrap()
            .check_declaration("Post", &def)
            .is_ok());

        assert_eq!(
            Relationship::new(tags(1))
                .with_delete_rule(DeleteRule::Deny)
                .check_declaration("Post", &def)
                .unwrap_err(),
            MappingError::RuleConflict {
                entity: "Post".into(),
                key: "tags".into(),
                declared: DeleteRule::Cascade,
                found: DeleteRule::Deny,
            }
        );
        assert!(matches!(
            Relationship::to_many(tags(1), 0, 5)
                .unwrap()
                .check_declaration("Post", &def),
            Err(MappingError::TypeConflict { .. })
        ));
        // Bounds come from the declaration even when the instance sets none.
        assert!(matches!(
            Relationship::new(tags(3)).check_declaration("Post", &def),
            Err(MappingError::Cardinality {
                source: CardinalityError::Violation { count: 3, .. },
                ..
            })
        ));
    }
}
