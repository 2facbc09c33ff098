//! sled-backed store.

use sled::{Db, Tree};
use strome_proto::{EncodeOptions, Mapping};

use super::config::StoreConfig;
use super::criteria::{matches_all, validate_all, Criterion};
use super::key::EntityKey;
use super::record::StoredRecord;
use super::Store;
use crate::error::StoreError;

/// Tree name for entity records.
const RECORDS_TREE: &str = "records";

/// A store that persists records in a sled database.
///
/// Records are keyed by `entity \0 id`, so a query is a prefix scan over
/// one entity type.
pub struct SledStore {
    /// The underlying sled database.
    db: Db,

    /// Tree for entity records.
    records: Tree,

    /// Encoding of stored dictionaries.
    options: EncodeOptions,
}

impl SledStore {
    /// Open or create a store with the given configuration.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let db = config.to_sled_config().open()?;
        let records = db.open_tree(RECORDS_TREE)?;
        tracing::debug!(
            path = %config.path.display(),
            temporary = config.temporary,
            recovered = db.was_recovered(),
            "opened sled store"
        );

        Ok(Self {
            db,
            records,
            options: config.encode_options(),
        })
    }

    /// Open a temporary store that is removed on drop.
    pub fn temporary() -> Result<Self, StoreError> {
        Self::open(StoreConfig::temporary())
    }

    /// Get the raw record under a key.
    pub fn record(&self, key: &EntityKey) -> Result<Option<StoredRecord>, StoreError> {
        self.records
            .get(key.encode())?
            .map(|bytes| StoredRecord::from_bytes(&bytes))
            .transpose()
    }

    /// Number of records of one entity type.
    pub fn count(&self, entity: &str) -> usize {
        self.records.scan_prefix(EntityKey::prefix(entity)).count()
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

impl Store for SledStore {
    fn persist_versioned(
        &self,
        key: &EntityKey,
        value: &Mapping,
        migration_version: u32,
    ) -> Result<(), StoreError> {
        let record = StoredRecord::encode(value, migration_version, self.options)?;
        self.records.insert(key.encode(), record.to_bytes()?)?;
        Ok(())
    }

    fn load_versioned(&self, key: &EntityKey) -> Result<(Mapping, u32), StoreError> {
        let record = self
            .record(key)?
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        Ok((record.mapping()?, record.migration_version))
    }

    fn delete(&self, key: &EntityKey) -> Result<(), StoreError> {
        match self.records.remove(key.encode())? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(key.clone())),
        }
    }

    fn query(&self, entity: &str, criteria: &[Criterion]) -> Result<Vec<Mapping>, StoreError> {
        validate_all(criteria)?;

        let mut rows = Vec::new();
        for result in self.records.scan_prefix(EntityKey::prefix(entity)) {
            let (key_bytes, value_bytes) = result?;
            EntityKey::decode(&key_bytes).ok_or(StoreError::InvalidKey)?;

            let row = StoredRecord::from_bytes(&value_bytes)?.mapping()?;
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

    fn person(age: i64) -> Mapping {
        let mut map = Mapping::new();
        map.insert("age".into(), FieldValue::Integer(age));
        map
    }

    #[test]
    fn test_persist_load_delete() {
        let store = SledStore::temporary().unwrap();
        let key = EntityKey::new("User", EntityId::generate());

        store.persist_versioned(&key, &person(45), 2).unwrap();
        assert_eq!(store.load_versioned(&key).unwrap(), (person(45), 2));
        assert_eq!(store.record(&key).unwrap().unwrap().migration_version, 2);

        store.delete(&key).unwrap();
        assert!(matches!(store.load(&key), Err(StoreError::NotFound(_))));
        assert!(store.record(&key).unwrap().is_none());
    }

    #[test]
    fn test_query_prefix_scan() {
        let store = SledStore::temporary().unwrap();
        for age in [20, 45, 60] {
            store
                .persist(&EntityKey::new("User", EntityId::generate()), &person(age))
                .unwrap();
        }
        store
            .persist(&EntityKey::new("UserGroup", EntityId::generate()), &person(45))
            .unwrap();

        assert_eq!(store.count("User"), 3);
        assert_eq!(store.query("User", &[]).unwrap().len(), 3);

        let mut older: Vec<i64> = store
            .query("User", &[Criterion::ge("age", 45i64)])
            .unwrap()
            .iter()
            .filter_map(|row| row["age"].as_integer())
            .collect();
        older.sort();
        assert_eq!(older, vec![45, 60]);
    }
}
