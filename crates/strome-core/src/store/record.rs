//! Record envelope for stored dictionaries.

use rkyv::{Archive, Deserialize, Serialize};
use strome_proto::{codec, EncodeOptions, Mapping};

use super::key::current_timestamp;
use crate::error::StoreError;

/// A stored entity dictionary with metadata.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct StoredRecord {
    /// JSON-encoded dictionary.
    pub data: Vec<u8>,

    /// Migration version of the entity shape that wrote the record.
    pub migration_version: u32,

    /// Creation timestamp in microseconds since Unix epoch.
    pub created_at: u64,
}

impl StoredRecord {
    /// Create a record with the current timestamp.
    pub fn new(data: Vec<u8>, migration_version: u32) -> Self {
        Self {
            data,
            migration_version,
            created_at: current_timestamp(),
        }
    }

    /// Encode a dictionary into a new record.
    pub fn encode(
        map: &Mapping,
        migration_version: u32,
        options: EncodeOptions,
    ) -> Result<Self, StoreError> {
        let data = codec::encode_mapping(map, options)?;
        Ok(Self::new(data, migration_version))
    }

    /// Decode the stored dictionary.
    pub fn mapping(&self) -> Result<Mapping, StoreError> {
        Ok(codec::decode_mapping(&self.data)?)
    }

    /// Serialize the record to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| StoreError::Record(e.to_string()))
    }

    /// Deserialize a record from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| StoreError::Record(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strome_proto::FieldValue;

    #[test]
    fn test_record_roundtrip() {
        let mut map = Mapping::new();
        map.insert("city".into(), FieldValue::from("Delhi"));

        let record = StoredRecord::encode(&map, 2, EncodeOptions::pretty()).unwrap();
        let bytes = record.to_bytes().unwrap();
        let decoded = StoredRecord::from_bytes(&bytes).unwrap();

        assert_eq!(decoded, record);
        assert_eq!(decoded.migration_version, 2);
        assert_eq!(decoded.mapping().unwrap(), map);
    }

    #[test]
    fn test_corrupt_bytes() {
        assert!(matches!(
            StoredRecord::from_bytes(&[1, 2, 3]),
            Err(StoreError::Record(_))
        ));
    }
}
