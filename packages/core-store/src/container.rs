//! The keyed container abstraction.
//!
//! Storage holds two kinds of maps: maps whose entries are all part of the
//! snapshot, and big maps that only carry a pointer and need a separate fetch
//! per key. Both answer the same question ("what is stored under this key?")
//! through `KeyedContainer`, so callers never branch on the kind of map.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{Error, MapKey, StorageValue};

/// Look values up by key.
///
/// # Returns
///
/// * `Ok(None)` - The container has no entry for the key.
/// * `Ok(Some(value))` - The value stored under the key.
/// * `Err(Error)` - The lookup itself failed (transport, remote status).
///
/// # Object Safety
///
/// This trait is object-safe: you can use `&dyn KeyedContainer`.
#[async_trait]
pub trait KeyedContainer: Send + Sync {
    async fn try_get(&self, key: &MapKey) -> Result<Option<StorageValue>, Error>;
}

/// A map whose entries live outside the snapshot.
///
/// The snapshot only knows the pointer; every lookup goes to the backing
/// store.
pub trait RemoteMap: KeyedContainer {
    /// The opaque identifier of the map in its backing store.
    fn pointer(&self) -> &str;
}

// Blanket implementations for references and smart pointers

#[async_trait]
impl<T: KeyedContainer + ?Sized> KeyedContainer for &T {
    async fn try_get(&self, key: &MapKey) -> Result<Option<StorageValue>, Error> {
        (**self).try_get(key).await
    }
}

#[async_trait]
impl<T: KeyedContainer + ?Sized> KeyedContainer for Box<T> {
    async fn try_get(&self, key: &MapKey) -> Result<Option<StorageValue>, Error> {
        self.as_ref().try_get(key).await
    }
}

#[async_trait]
impl<T: KeyedContainer + ?Sized> KeyedContainer for Arc<T> {
    async fn try_get(&self, key: &MapKey) -> Result<Option<StorageValue>, Error> {
        self.as_ref().try_get(key).await
    }
}

/// A big map as it sits inside a storage tree.
///
/// The entry count belongs to the snapshot, not to the remote map, so the
/// handle carries it. Cloning the handle shares the underlying remote map.
#[derive(Clone)]
pub struct BigMapHandle {
    map: Arc<dyn RemoteMap>,
    size: Option<u64>,
}

impl BigMapHandle {
    pub fn new(map: Arc<dyn RemoteMap>, size: Option<u64>) -> Self {
        Self { map, size }
    }

    pub fn pointer(&self) -> &str {
        self.map.pointer()
    }

    /// Number of entries, when the snapshot recorded it.
    pub fn size(&self) -> Option<u64> {
        self.size
    }
}

#[async_trait]
impl KeyedContainer for BigMapHandle {
    async fn try_get(&self, key: &MapKey) -> Result<Option<StorageValue>, Error> {
        self.map.try_get(key).await
    }
}

impl fmt::Debug for BigMapHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigMap")
            .field("pointer", &self.pointer())
            .field("size", &self.size())
            .finish()
    }
}

/// Two handles are equal when they point at the same big map.
impl PartialEq for BigMapHandle {
    fn eq(&self, other: &Self) -> bool {
        self.pointer() == other.pointer()
    }
}
