//! Persistence boundary.
//!
//! [`Store`] is the interface the mapping core persists entity dictionaries
//! through. Two implementations are bundled: [`MemoryStore`] and the
//! sled-backed [`SledStore`].

mod config;
mod criteria;
mod key;
mod memory;
mod record;
mod sled_store;

pub use config::StoreConfig;
pub use criteria::{like_match, matches_all, validate_all, Criterion};
pub use key::{current_timestamp, EntityId, EntityKey};
pub use memory::MemoryStore;
pub use record::StoredRecord;
pub use sled_store::SledStore;

use strome_proto::Mapping;

use crate::catalog::DEFAULT_MIGRATION_VERSION;
use crate::error::StoreError;

/// A backing store for entity dictionaries.
pub trait Store: Send + Sync {
    /// Persist a dictionary tagged with the migration version that wrote it.
    fn persist_versioned(
        &self,
        key: &EntityKey,
        value: &Mapping,
        migration_version: u32,
    ) -> Result<(), StoreError>;

    /// Load a dictionary and the migration version it was written with.
    fn load_versioned(&self, key: &EntityKey) -> Result<(Mapping, u32), StoreError>;

    /// Delete a record. Fails with [`StoreError::NotFound`] if absent.
    fn delete(&self, key: &EntityKey) -> Result<(), StoreError>;

    /// Dictionaries of one entity type matching every criterion, in key order.
    fn query(&self, entity: &str, criteria: &[Criterion]) -> Result<Vec<Mapping>, StoreError>;

    /// Persist a dictionary, replacing any previous record under the key.
    fn persist(&self, key: &EntityKey, value: &Mapping) -> Result<(), StoreError> {
        self.persist_versioned(key, value, DEFAULT_MIGRATION_VERSION)
    }

    /// Load a dictionary. Fails with [`StoreError::NotFound`] if absent.
    fn load(&self, key: &EntityKey) -> Result<Mapping, StoreError> {
        self.load_versioned(key).map(|(map, _)| map)
    }
}
