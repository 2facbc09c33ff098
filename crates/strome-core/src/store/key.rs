//! Entity identity and store keys.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::StoreError;

/// Identity of one entity instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId([u8; 16]);

impl EntityId {
    /// Wrap raw identifier bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Generate a new identity.
    ///
    /// A nanosecond timestamp prefix followed by a process-wide counter, so
    /// identities minted by one process sort in creation order.
    pub fn generate() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        let counter = COUNTER.fetch_add(1, Ordering::SeqCst);

        let mut id = [0u8; 16];
        id[..8].copy_from_slice(&now.to_be_bytes());
        id[8..16].copy_from_slice(&counter.to_be_bytes());

        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for EntityId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s.chars().filter(|c| *c != '-').collect();
        let bytes = hex::decode(hex).map_err(|_| StoreError::InvalidKey)?;
        let bytes: [u8; 16] = bytes.try_into().map_err(|_| StoreError::InvalidKey)?;
        Ok(Self(bytes))
    }
}

/// Key of a persisted entity dictionary: the entity type plus its identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey {
    /// Entity type name.
    pub entity: String,
    /// Instance identity.
    pub id: EntityId,
}

impl EntityKey {
    /// Create a key.
    pub fn new(entity: impl Into<String>, id: EntityId) -> Self {
        Self {
            entity: entity.into(),
            id,
        }
    }

    /// Encode as `entity \0 id` so that one prefix scan lists a whole type.
    pub fn encode(&self) -> Vec<u8> {
        let mut key = Self::prefix(&self.entity);
        key.extend_from_slice(self.id.as_bytes());
        key
    }

    /// Decode a key produced by [`EntityKey::encode`].
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let sep = bytes.iter().position(|b| *b == 0)?;
        let entity = std::str::from_utf8(&bytes[..sep]).ok()?;
        let id: [u8; 16] = bytes[sep + 1..].try_into().ok()?;
        Some(Self::new(entity, EntityId(id)))
    }

    /// Prefix shared by every key of an entity type.
    pub fn prefix(entity: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(entity.len() + 1 + 16);
        prefix.extend_from_slice(entity.as_bytes());
        prefix.push(0); // Null separator
        prefix
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity, self.id)
    }
}

/// Current time in microseconds since the Unix epoch.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or_default()
}
