//! Persistence entry point tying entities, a store and the entity graph.

use std::collections::HashSet;
use std::sync::Arc;

use strome_proto::Mapping;

use crate::catalog::Catalog;
use crate::error::{Error, StoreError};
use crate::graph::{DeleteOutcome, EntityGraph, GraphMutator, SharedGraph};
use crate::mapping::Entity;
use crate::store::{Criterion, EntityId, EntityKey, Store};

/// Saves, loads and deletes entities through a [`Store`].
pub struct Context<S> {
    store: S,
    catalog: Arc<Catalog>,
}

impl<S: Store> Context<S> {
    /// Create a context with an empty catalog.
    pub fn new(store: S) -> Self {
        Self::with_catalog(store, Arc::new(Catalog::new()))
    }

    /// Create a context sharing an existing catalog.
    pub fn with_catalog(store: S, catalog: Arc<Catalog>) -> Self {
        Self { store, catalog }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The catalog of registered entity types.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Create an empty graph over this context's catalog.
    pub fn graph(&self) -> SharedGraph {
        SharedGraph::new(EntityGraph::new(self.catalog.clone()))
    }

    /// Persist an entity under a new identity.
    pub fn save<E: Entity>(&self, entity: &E) -> Result<EntityKey, Error> {
        let key = EntityKey::new(E::NAME, EntityId::generate());
        self.save_as(&key, entity)?;
        Ok(key)
    }

    /// Persist an entity under an existing key, replacing the stored record.
    pub fn save_as<E: Entity>(&self, key: &EntityKey, entity: &E) -> Result<(), Error> {
        if key.entity != E::NAME {
            return Err(Error::EntityMismatch {
                expected: E::NAME.to_string(),
                key: key.clone(),
            });
        }
        self.catalog.register::<E>()?;
        self.store
            .persist_versioned(key, &entity.to_checked_dictionary()?, E::MIGRATION_VERSION)?;
        tracing::debug!(%key, version = E::MIGRATION_VERSION, "saved");
        Ok(())
    }

    /// Load an entity by identity.
    pub fn load<E: Entity>(&self, id: EntityId) -> Result<E, Error> {
        let key = EntityKey::new(E::NAME, id);
        let (map, version) = self.store.load_versioned(&key)?;
        check_version::<E>(version)?;
        Ok(E::from_dictionary(&map)?)
    }

    /// Query stored entities. An empty criteria list matches all.
    pub fn fetch<E: Entity>(&self, criteria: &[Criterion]) -> Result<Vec<E>, Error> {
        E::fetch(&self.store, criteria)
    }

    /// Delete a stored record.
    pub fn remove(&self, key: &EntityKey) -> Result<(), Error> {
        self.store.delete(key)?;
        tracing::debug!(%key, "removed");
        Ok(())
    }

    /// Load a stored entity into a graph, keeping its identity as the root id.
    pub fn attach<E: Entity>(&self, graph: &SharedGraph, id: EntityId) -> Result<(), Error> {
        let key = EntityKey::new(E::NAME, id);
        let (map, version) = self.store.load_versioned(&key)?;
        check_version::<E>(version)?;
        self.catalog.register::<E>()?;
        graph.with_mut(|g| g.insert_mapping_with_id(E::NAME, id, &map))?;
        Ok(())
    }

    /// Delete a graph node, propagate its delete rules, and mirror the result
    /// into the store.
    ///
    /// Deleted nodes lose their records where they have one. A nullified node
    /// is re-persisted from the graph if it has its own record; otherwise the
    /// nearest owners that have one are. The graph stays locked until the
    /// store is updated. If a store call fails, the records already touched
    /// are written back and the graph is restored, so neither changes.
    pub fn delete_in_graph(&self, graph: &SharedGraph, id: EntityId) -> Result<DeleteOutcome, Error> {
        let mut guard = graph.lock();
        let snapshot = guard.clone();
        let outcome = GraphMutator::new(&mut guard).delete(id)?;

        let mut undo = Vec::new();
        if let Err(e) = self.mirror_delete(&guard, &outcome, &mut undo) {
            self.restore(undo);
            *guard = snapshot;
            tracing::warn!(%id, error = %e, "graph delete rolled back");
            return Err(e);
        }

        tracing::info!(
            deleted = outcome.deleted.len(),
            nullified = outcome.nullified.len(),
            "graph delete applied"
        );
        Ok(outcome)
    }

    fn mirror_delete(
        &self,
        graph: &EntityGraph,
        outcome: &DeleteOutcome,
        undo: &mut Vec<SavedRecord>,
    ) -> Result<(), Error> {
        for (entity, id) in &outcome.deleted {
            let key = EntityKey::new(entity.as_str(), *id);
            let (map, version) = match self.store.load_versioned(&key) {
                Ok(record) => record,
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            };
            undo.push((key.clone(), map, version));
            match self.store.delete(&key) {
                Ok(()) | Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let mut seen = HashSet::new();
        let mut pending: Vec<EntityId> = outcome.nullified.iter().map(|(_, id, _)| *id).collect();
        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(node) = graph.get(id) else {
                continue;
            };
            let key = EntityKey::new(node.entity.as_str(), id);
            let (previous, version) = match self.store.load_versioned(&key) {
                Ok(record) => record,
                Err(StoreError::NotFound(_)) => {
                    let owners = graph.owners_of(id);
                    tracing::debug!(%key, owners = owners.len(), "no record of its own, re-persisting owners");
                    pending.extend(owners);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            match graph.mapping(id) {
                Ok(map) => {
                    undo.push((key.clone(), previous, version));
                    self.store.persist_versioned(&key, &map, version)?;
                }
                Err(e) => {
                    tracing::warn!(%key, error = %e, "nullified entity not re-persisted");
                }
            }
        }
        Ok(())
    }

    fn restore(&self, undo: Vec<SavedRecord>) {
        for (key, map, version) in undo.into_iter().rev() {
            if let Err(e) = self.store.persist_versioned(&key, &map, version) {
                tracing::error!(%key, error = %e, "record not restored after failed graph delete");
            }
        }
    }
}

/// A record as it was before a graph delete touched it.
type SavedRecord = (EntityKey, Mapping, u32);

fn check_version<E: Entity>(stored: u32) -> Result<(), Error> {
    if stored > E::MIGRATION_VERSION {
        return Err(Error::UnsupportedVersion {
            entity: E::NAME.to_string(),
            stored,
            supported: E::MIGRATION_VERSION,
        });
    }
    if stored < E::MIGRATION_VERSION {
        tracing::warn!(
            entity = E::NAME,
            stored,
            current = E::MIGRATION_VERSION,
            "decoding record written by an older entity shape"
        );
    }
    Ok(())
}
