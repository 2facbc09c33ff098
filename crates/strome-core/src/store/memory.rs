//! In-memory store.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use strome_proto::{EncodeOptions, Mapping};

use super::criteria::{matches_all, validate_all, Criterion};
use super::key::EntityKey;
use super::record::StoredRecord;
use super::Store;
use crate::error::StoreError;

/// A store that keeps encoded records in a map. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<EntityKey, StoredRecord>>,
    options: EncodeOptions,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that encodes with the given options.
    pub fn with_options(options: EncodeOptions) -> Self {
        Self {
            records: RwLock::default(),
            options,
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Get the raw record under a key.
    pub fn record(&self, key: &EntityKey) -> Option<StoredRecord> {
        self.records.read().get(key).cloned()
    }
}

impl Store for MemoryStore {
    fn persist_versioned(
        &self,
        key: &EntityKey,
        value: &Mapping,
        migration_version: u32,
    ) -> Result<(), StoreError> {
        let record = StoredRecord::encode(value, migration_version, self.options)?;
        self.records.write().insert(key.clone(), record);
        Ok(())
    }

    fn load_versioned(&self, key: &EntityKey) -> Result<(Mapping, u32), StoreError> {
        let records = self.records.read();
        let record = records
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        Ok((record.mapping()?, record.migration_version))
    }

    fn delete(&self, key: &EntityKey) -> Result<(), StoreError> {
        self.records
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    fn query(&self, entity: &str, criteria: &[Criterion]) -> Result<Vec<Mapping>, StoreError> {
        validate_all(criteria)?;

        let records = self.records.read();
        let mut rows = Vec::new();
        for (_, record) in records.iter().filter(|(key, _)| key.entity == entity) {
            let row = record.mapping()?;
            if matches_all(criteria, &row) {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EntityId;
    use strome_proto::FieldValue;

    fn city(name: &str) -> Mapping {
        let mut map = Mapping::new();
        map.insert("city".into(), FieldValue::from(name));
        map
    }

    #[test]
    fn test_persist_load_delete() {
        let store = MemoryStore::new();
        let key = EntityKey::new("Address", EntityId::generate());

        store.persist(&key, &city("Delhi")).unwrap();
        assert_eq!(store.load(&key).unwrap(), city("Delhi"));
        assert_eq!(store.load_versioned(&key).unwrap().1, 1);

        store.persist_versioned(&key, &city("Pune"), 3).unwrap();
        assert_eq!(store.load_versioned(&key).unwrap(), (city("Pune"), 3));
        assert_eq!(store.len(), 1);

        store.delete(&key).unwrap();
        assert!(matches!(store.load(&key), Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete(&key), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_query_scoped_to_entity() {
        let store = MemoryStore::new();
        store
            .persist(&EntityKey::new("Address", EntityId::generate()), &city("Delhi"))
            .unwrap();
        store
            .persist(&EntityKey::new("Address", EntityId::generate()), &city("Pune"))
            .unwrap();
        store
            .persist(&EntityKey::new("Office", EntityId::generate()), &city("Delhi"))
            .unwrap();

        assert_eq!(store.query("Address", &[]).unwrap().len(), 2);
        let delhi = store
            .query("Address", &[Criterion::eq("city", "Delhi")])
            .unwrap();
        assert_eq!(delhi, vec![city("Delhi")]);
        assert!(store.query("Nothing", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_query_rejects_raw() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.query("Address", &[Criterion::Raw("city = 'Delhi'".into())]),
            Err(StoreError::UnsupportedCriterion(_))
        ));
    }
}
