//! Identity-keyed entity graph.

use std::collections::BTreeMap;
use std::sync::Arc;

use strome_proto::{FieldValue, Mapping, ValueKind};

use crate::catalog::{Catalog, DeleteRule, PropertyDef, RelationshipDef, RelationshipType, Shape};
use crate::error::{CardinalityError, Error, MappingError};
use crate::mapping::Entity;
use crate::store::EntityId;

/// Outgoing edges of one relationship property.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipSlot {
    /// Relationship name.
    pub name: String,
    /// Related entity type.
    pub target: String,
    /// Rule applied to the targets when the owner is deleted.
    pub delete_rule: DeleteRule,
    /// Declared cardinality.
    pub relationship_type: RelationshipType,
    /// Reciprocal relationship on the target, if declared.
    pub inverse: Option<String>,
    /// Singular or sequence.
    pub shape: Shape,
    /// Whether the relationship may be absent.
    pub optional: bool,
    /// Optional relationship with no value (as opposed to an empty sequence).
    pub absent: bool,
    /// Target identities in order.
    pub targets: Vec<EntityId>,
}

impl RelationshipSlot {
    fn from_def(def: &RelationshipDef) -> Self {
        Self {
            name: def.name.clone(),
            target: def.target.clone(),
            delete_rule: def.delete_rule,
            relationship_type: def.relationship_type,
            inverse: def.inverse.clone(),
            shape: def.shape,
            optional: def.optional,
            absent: false,
            targets: Vec::new(),
        }
    }
}

/// One entity instance in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// Instance identity.
    pub id: EntityId,
    /// Entity type name.
    pub entity: String,
    /// Field values by name.
    pub fields: Mapping,
    /// Relationship slots in declared order.
    pub slots: Vec<RelationshipSlot>,
}

impl GraphNode {
    /// Get a relationship slot by name.
    pub fn slot(&self, name: &str) -> Option<&RelationshipSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut RelationshipSlot> {
        self.slots.iter_mut().find(|s| s.name == name)
    }
}

/// An arena of entity instances connected by relationship edges.
///
/// Nested dictionaries are flattened into one node per entity; edges may
/// form cycles once [`EntityGraph::link`] is used.
#[derive(Debug, Clone)]
pub struct EntityGraph {
    catalog: Arc<Catalog>,
    nodes: BTreeMap<EntityId, GraphNode>,
}

impl Default for EntityGraph {
    fn default() -> Self {
        Self::new(Arc::new(Catalog::new()))
    }
}

impl EntityGraph {
    /// Create an empty graph resolving entity types through `catalog`.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            nodes: BTreeMap::new(),
        }
    }

    /// The catalog used to resolve entity types.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check if a node exists.
    pub fn contains(&self, id: EntityId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Get a node.
    pub fn get(&self, id: EntityId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    /// All node identities.
    pub fn ids(&self) -> Vec<EntityId> {
        self.nodes.keys().copied().collect()
    }

    /// Identities of the nodes of one entity type.
    pub fn of_type(&self, entity: &str) -> Vec<EntityId> {
        self.nodes
            .values()
            .filter(|n| n.entity == entity)
            .map(|n| n.id)
            .collect()
    }

    /// Identities of the nodes with a relationship slot pointing at `id`.
    pub fn owners_of(&self, id: EntityId) -> Vec<EntityId> {
        self.nodes
            .values()
            .filter(|n| n.slots.iter().any(|slot| slot.targets.contains(&id)))
            .map(|n| n.id)
            .collect()
    }

    /// Insert an entity and every entity nested in it. Returns the root id.
    pub fn insert<E: Entity>(&mut self, entity: &E) -> Result<EntityId, Error> {
        self.catalog.register::<E>()?;
        Ok(self.insert_mapping(E::NAME, &entity.to_checked_dictionary()?)?)
    }

    /// Insert a dictionary of a registered entity type. Returns the root id.
    pub fn insert_mapping(&mut self, entity: &str, map: &Mapping) -> Result<EntityId, MappingError> {
        self.insert_mapping_with_id(entity, EntityId::generate(), map)
    }

    /// Insert a dictionary with a caller-chosen root identity.
    ///
    /// Nothing is inserted unless the whole nested dictionary is valid.
    pub fn insert_mapping_with_id(
        &mut self,
        entity: &str,
        id: EntityId,
        map: &Mapping,
    ) -> Result<EntityId, MappingError> {
        if self.nodes.contains_key(&id) {
            return Err(MappingError::DuplicateNode(id));
        }

        let mut staged = Vec::new();
        self.stage(entity, id, map, &mut staged)?;
        tracing::debug!(entity, %id, nodes = staged.len(), "inserted subgraph");
        self.nodes.extend(staged.into_iter().map(|node| (node.id, node)));
        Ok(id)
    }

    fn stage(
        &self,
        entity: &str,
        id: EntityId,
        map: &Mapping,
        staged: &mut Vec<GraphNode>,
    ) -> Result<(), MappingError> {
        let schema = self.catalog.require(entity)?;
        let missing = |key: &str| MappingError::MissingKey {
            entity: schema.name.clone(),
            key: key.to_string(),
        };

        let mut node = GraphNode {
            id,
            entity: schema.name.clone(),
            fields: Mapping::new(),
            slots: Vec::new(),
        };

        for property in &schema.properties {
            match property {
                PropertyDef::Field(field) => {
                    let value = map.get(&field.name).cloned().unwrap_or_default();
                    if value.is_null() && !field.optional {
                        return Err(missing(&field.name));
                    }
                    node.fields.insert(field.name.clone(), value);
                }
                PropertyDef::Relationship(def) => {
                    let mut slot = RelationshipSlot::from_def(def);
                    match map.get(&def.name) {
                        None | Some(FieldValue::Null) => {
                            if !def.optional {
                                return Err(missing(&def.name));
                            }
                            slot.absent = true;
                        }
                        Some(FieldValue::Mapping(child)) if def.shape == Shape::One => {
                            let child_id =
                                self.stage_child(&schema.name, &def.name, &def.target, child, staged)?;
                            slot.targets.push(child_id);
                        }
                        Some(FieldValue::Sequence(items)) if def.shape == Shape::Many => {
                            for (i, item) in items.iter().enumerate() {
                                let key = format!("{}[{i}]", def.name);
                                let child = item.as_mapping().ok_or_else(|| {
                                    MappingError::ShapeMismatch {
                                        entity: schema.name.clone(),
                                        key: key.clone(),
                                        expected: ValueKind::Mapping,
                                        found: item.kind(),
                                    }
                                })?;
                                let child_id =
                                    self.stage_child(&schema.name, &key, &def.target, child, staged)?;
                                slot.targets.push(child_id);
                            }
                            def.relationship_type
                                .check_count(slot.targets.len())
                                .map_err(|source| MappingError::Cardinality {
                                    entity: schema.name.clone(),
                                    key: def.name.clone(),
                                    source,
                                })?;
                        }
                        Some(other) => {
                            return Err(MappingError::ShapeMismatch {
                                entity: schema.name.clone(),
                                key: def.name.clone(),
                                expected: def.shape.value_kind(),
                                found: other.kind(),
                            })
                        }
                    }
                    node.slots.push(slot);
                }
            }
        }

        staged.push(node);
        Ok(())
    }

    fn stage_child(
        &self,
        owner: &str,
        key: &str,
        target: &str,
        map: &Mapping,
        staged: &mut Vec<GraphNode>,
    ) -> Result<EntityId, MappingError> {
        let id = EntityId::generate();
        self.stage(target, id, map, staged)
            .map_err(|e| MappingError::Nested {
                entity: owner.to_string(),
                key: key.to_string(),
                source: Box::new(e),
            })?;
        Ok(id)
    }

    /// Add an edge from `owner.relationship` to `target`.
    ///
    /// A singular relationship is repointed; a sequence gains the target
    /// unless it is already present. Edges may close cycles.
    pub fn link(
        &mut self,
        owner: EntityId,
        relationship: &str,
        target: EntityId,
    ) -> Result<(), MappingError> {
        let target_entity = self
            .nodes
            .get(&target)
            .ok_or(MappingError::UnknownNode(target))?
            .entity
            .clone();
        let node = self
            .nodes
            .get_mut(&owner)
            .ok_or(MappingError::UnknownNode(owner))?;
        let entity = node.entity.clone();
        let slot = node
            .slot_mut(relationship)
            .ok_or_else(|| MappingError::UndeclaredProperty {
                entity: entity.clone(),
                key: relationship.to_string(),
            })?;

        if slot.target != target_entity {
            return Err(MappingError::WrongEntity {
                expected: slot.target.clone(),
                found: target_entity,
                id: target,
            });
        }

        match slot.shape {
            Shape::One => slot.targets = vec![target],
            Shape::Many => {
                if slot.targets.contains(&target) {
                    return Ok(());
                }
                if let RelationshipType::ToMany {
                    minimum,
                    maximum: Some(maximum),
                } = slot.relationship_type
                {
                    let count = slot.targets.len() + 1;
                    if count > maximum {
                        return Err(MappingError::Cardinality {
                            entity,
                            key: relationship.to_string(),
                            source: CardinalityError::Violation {
                                count,
                                minimum,
                                maximum: Some(maximum),
                            },
                        });
                    }
                }
                slot.targets.push(target);
            }
        }
        slot.absent = false;
        Ok(())
    }

    /// Remove the edge from `owner.relationship` to `target`.
    /// Returns whether an edge was removed.
    pub fn unlink(
        &mut self,
        owner: EntityId,
        relationship: &str,
        target: EntityId,
    ) -> Result<bool, MappingError> {
        let node = self
            .nodes
            .get_mut(&owner)
            .ok_or(MappingError::UnknownNode(owner))?;
        let entity = node.entity.clone();
        let slot = node
            .slot_mut(relationship)
            .ok_or_else(|| MappingError::UndeclaredProperty {
                entity,
                key: relationship.to_string(),
            })?;

        let before = slot.targets.len();
        slot.targets.retain(|t| *t != target);
        Ok(slot.targets.len() != before)
    }

    /// Drop every edge from `node` back to `owner`, limited to the slot named
    /// `inverse` when given. Returns the names of the slots that changed.
    pub(crate) fn clear_links_to(
        &mut self,
        node: EntityId,
        owner: EntityId,
        inverse: Option<&str>,
    ) -> Vec<String> {
        let Some(node) = self.nodes.get_mut(&node) else {
            return Vec::new();
        };

        let mut cleared = Vec::new();
        for slot in node.slots.iter_mut() {
            if inverse.is_some_and(|name| name != slot.name) {
                continue;
            }
            let before = slot.targets.len();
            slot.targets.retain(|t| *t != owner);
            if slot.targets.len() != before {
                cleared.push(slot.name.clone());
            }
        }
        cleared
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<GraphNode> {
        self.nodes.remove(&id)
    }

    /// Re-derive the nested dictionary rooted at `id`.
    pub fn mapping(&self, id: EntityId) -> Result<Mapping, MappingError> {
        let mut path = Vec::new();
        self.derive(id, &mut path)
    }

    fn derive(&self, id: EntityId, path: &mut Vec<EntityId>) -> Result<Mapping, MappingError> {
        let node = self.nodes.get(&id).ok_or(MappingError::UnknownNode(id))?;
        if path.contains(&id) {
            return Err(MappingError::CyclicReference {
                entity: node.entity.clone(),
                id,
            });
        }
        path.push(id);

        let mut map = node.fields.clone();
        for slot in &node.slots {
            let mut related = Vec::with_capacity(slot.targets.len());
            for target in &slot.targets {
                if !self.nodes.contains_key(target) {
                    return Err(MappingError::DanglingReference {
                        entity: node.entity.clone(),
                        key: slot.name.clone(),
                        id: *target,
                    });
                }
                related.push(FieldValue::Mapping(self.derive(*target, path)?));
            }

            let value = match slot.shape {
                Shape::One => related.pop().unwrap_or_default(),
                Shape::Many if slot.absent && related.is_empty() => FieldValue::Null,
                Shape::Many => {
                    slot.relationship_type
                        .check_count(related.len())
                        .map_err(|source| MappingError::Cardinality {
                            entity: node.entity.clone(),
                            key: slot.name.clone(),
                            source,
                        })?;
                    FieldValue::Sequence(related)
                }
            };
            if value.is_null() && !slot.optional {
                return Err(MappingError::MissingKey {
                    entity: node.entity.clone(),
                    key: slot.name.clone(),
                });
            }
            map.insert(slot.name.clone(), value);
        }

        path.pop();
        Ok(map)
    }

    /// Rebuild the typed entity rooted at `id`.
    pub fn materialize<E: Entity>(&self, id: EntityId) -> Result<E, MappingError> {
        let node = self.nodes.get(&id).ok_or(MappingError::UnknownNode(id))?;
        if node.entity != E::NAME {
            return Err(MappingError::WrongEntity {
                expected: E::NAME.to_string(),
                found: node.entity.clone(),
                id,
            });
        }
        E::from_dictionary(&self.mapping(id)?)
    }
}
