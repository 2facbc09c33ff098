//! Delete propagation over an entity graph.
//!
//! Deleting a node applies the delete rule of each of its relationships:
//! - `noAction`: related nodes are left alone
//! - `nullify`: the related node's link back to the deleted node is cleared
//! - `cascade`: related nodes are deleted, recursively
//! - `deny`: the delete is refused while related nodes exist
//!
//! Every `deny` in the cascade closure is checked before the graph is
//! touched, so a refused delete leaves it unmodified.

use std::collections::HashSet;

use super::graph::EntityGraph;
use crate::catalog::DeleteRule;
use crate::error::CascadeError;
use crate::store::EntityId;

/// Result of a delete.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Entities that were deleted, in visit order.
    pub deleted: Vec<(String, EntityId)>,
    /// Relationships that were cleared: entity, identity, relationship name.
    pub nullified: Vec<(String, EntityId, String)>,
}

impl DeleteOutcome {
    /// Get the total number of affected entities.
    pub fn affected_count(&self) -> usize {
        self.deleted.len() + self.nullified.len()
    }

    /// Check if an entity was deleted.
    pub fn was_deleted(&self, id: EntityId) -> bool {
        self.deleted.iter().any(|(_, d)| *d == id)
    }
}

/// A planned delete: nothing has been modified yet.
#[derive(Debug, Default)]
struct DeletePlan {
    /// Cascade closure in visit order, root first.
    delete: Vec<EntityId>,
    /// (related node, deleted owner, reciprocal slot) links to clear.
    nullify: Vec<(EntityId, EntityId, Option<String>)>,
}

/// Applies delete rules to one graph. Holds the graph exclusively for the
/// whole delete.
pub struct GraphMutator<'g> {
    graph: &'g mut EntityGraph,
}

impl<'g> GraphMutator<'g> {
    /// Create a mutator over a graph.
    pub fn new(graph: &'g mut EntityGraph) -> Self {
        Self { graph }
    }

    /// Delete a node and propagate its delete rules.
    pub fn delete(&mut self, id: EntityId) -> Result<DeleteOutcome, CascadeError> {
        let plan = self.plan(id)?;
        Ok(self.apply(plan))
    }

    /// Check whether a delete would be allowed, without modifying anything.
    pub fn can_delete(&self, id: EntityId) -> Result<(), CascadeError> {
        self.plan(id).map(|_| ())
    }

    fn plan(&self, root: EntityId) -> Result<DeletePlan, CascadeError> {
        if !self.graph.contains(root) {
            return Err(CascadeError::UnknownEntity(root));
        }

        let mut plan = DeletePlan::default();
        let mut visited = HashSet::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            // Revisits through cycles are no-ops.
            if !visited.insert(id) {
                continue;
            }
            // Dangling targets have nothing left to delete.
            let Some(node) = self.graph.get(id) else {
                continue;
            };
            plan.delete.push(id);

            for slot in node.slots.iter().filter(|s| s.delete_rule == DeleteRule::Deny) {
                let count = slot
                    .targets
                    .iter()
                    .filter(|t| self.graph.contains(**t))
                    .count();
                if count > 0 {
                    tracing::debug!(
                        entity = %node.entity,
                        %id,
                        relationship = %slot.name,
                        count,
                        "delete denied"
                    );
                    return Err(CascadeError::DeleteDenied {
                        entity: node.entity.clone(),
                        id,
                        relationship: slot.name.clone(),
                        count,
                    });
                }
            }

            // Declared order: push in reverse so the first target is visited first.
            let cascade: Vec<EntityId> = node
                .slots
                .iter()
                .filter(|s| s.delete_rule == DeleteRule::Cascade)
                .flat_map(|s| s.targets.iter().copied())
                .collect();
            stack.extend(cascade.into_iter().rev().filter(|t| !visited.contains(t)));

            for slot in node.slots.iter().filter(|s| s.delete_rule == DeleteRule::Nullify) {
                for target in &slot.targets {
                    plan.nullify.push((*target, id, slot.inverse.clone()));
                }
            }
        }

        Ok(plan)
    }

    fn apply(&mut self, plan: DeletePlan) -> DeleteOutcome {
        let mut outcome = DeleteOutcome::default();
        let doomed: HashSet<EntityId> = plan.delete.iter().copied().collect();

        for (target, owner, inverse) in plan.nullify {
            if doomed.contains(&target) {
                continue;
            }
            let Some(entity) = self.graph.get(target).map(|n| n.entity.clone()) else {
                continue;
            };
            for relationship in self.graph.clear_links_to(target, owner, inverse.as_deref()) {
                tracing::debug!(%entity, id = %target, %relationship, "nullified link");
                outcome.nullified.push((entity.clone(), target, relationship));
            }
        }

        for id in plan.delete {
            if let Some(node) = self.graph.remove(id) {
                tracing::debug!(entity = %node.entity, %id, "deleted");
                outcome.deleted.push((node.entity, id));
            }
        }

        outcome
    }
}
