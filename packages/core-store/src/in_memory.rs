//! Maps held entirely inside the storage snapshot.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::{Error, KeyedContainer, MapKey, StorageValue};

/// A map whose entries are all part of the snapshot.
///
/// Iteration follows insertion order, which is the order the contract
/// storage listed the entries in. Lookups never fail: a missing key is just
/// `None`.
///
/// # Example
///
/// ```rust
/// use storeview_core::{InMemoryMap, MapKey, StorageValue};
///
/// let mut map = InMemoryMap::new();
/// map.insert(MapKey::from("tz1alice"), StorageValue::from(100i64));
///
/// assert_eq!(map.get(&MapKey::from("tz1alice")), Some(&StorageValue::from(100i64)));
/// assert_eq!(map.get(&MapKey::from("tz1bob")), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryMap {
    entries: IndexMap<MapKey, StorageValue>,
}

impl InMemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry.
    ///
    /// Re-inserting an existing key replaces its value and keeps its original
    /// position.
    pub fn insert(&mut self, key: MapKey, value: StorageValue) -> Option<StorageValue> {
        self.entries.insert(key, value)
    }

    pub fn get(&self, key: &MapKey) -> Option<&StorageValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &MapKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &StorageValue)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &MapKey> {
        self.entries.keys()
    }
}

impl FromIterator<(MapKey, StorageValue)> for InMemoryMap {
    fn from_iter<I: IntoIterator<Item = (MapKey, StorageValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Two maps are equal when they hold the same entries in the same order.
impl PartialEq for InMemoryMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries.iter().eq(other.entries.iter())
    }
}

#[async_trait]
impl KeyedContainer for InMemoryMap {
    async fn try_get(&self, key: &MapKey) -> Result<Option<StorageValue>, Error> {
        Ok(self.get(key).cloned())
    }
}
