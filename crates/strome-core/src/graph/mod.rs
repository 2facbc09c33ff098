//! Entity graph and delete propagation.

mod cascade;
#[cfg(test)]
pub(crate) mod fixtures;
mod graph;

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

pub use cascade::{DeleteOutcome, GraphMutator};
pub use graph::{EntityGraph, GraphNode, RelationshipSlot};

use crate::error::CascadeError;
use crate::store::EntityId;

/// An entity graph shared between threads.
///
/// Each delete holds the lock for its whole transaction, so deletes over
/// overlapping subgraphs never interleave.
#[derive(Debug, Clone, Default)]
pub struct SharedGraph {
    inner: Arc<Mutex<EntityGraph>>,
}

impl SharedGraph {
    /// Wrap a graph.
    pub fn new(graph: EntityGraph) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Lock the graph.
    pub fn lock(&self) -> MutexGuard<'_, EntityGraph> {
        self.inner.lock()
    }

    /// Delete a node and propagate its delete rules under one lock.
    pub fn delete(&self, id: EntityId) -> Result<DeleteOutcome, CascadeError> {
        let mut graph = self.inner.lock();
        GraphMutator::new(&mut graph).delete(id)
    }

    /// Run a closure with shared access to the graph.
    pub fn with<R>(&self, f: impl FnOnce(&EntityGraph) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Run a closure with exclusive access to the graph.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut EntityGraph) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl From<EntityGraph> for SharedGraph {
    fn from(graph: EntityGraph) -> Self {
        Self::new(graph)
    }
}
