//! Building storage trees from JSON snapshot documents.
//!
//! A snapshot document is plain JSON with a few tagged objects for the things
//! JSON cannot say on its own:
//!
//! ```text
//! { "$map": [ { "key": k, "value": v }, ... ] }      in-memory map
//! { "$big_map": "17" }                               big map by pointer
//! { "$big_map": { "id": "17", "size": 4 } }          big map with entry count
//! { "$int": "123456789012345678901234" }             arbitrary-precision integer
//! { "$bytes": "0aff" }                               raw bytes, hex encoded
//! ```
//!
//! Big maps need a `RemoteMapResolver` that knows where their entries live.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::num_bigint::BigInt;
use serde_json::Value as JsonValue;

use crate::{BigMapHandle, Error, InMemoryMap, MapKey, RemoteMap, StorageValue};

const MAP_TAG: &str = "$map";
const BIG_MAP_TAG: &str = "$big_map";
const INT_TAG: &str = "$int";
const BYTES_TAG: &str = "$bytes";

/// Turns a big map pointer found in a snapshot into a live remote map.
pub trait RemoteMapResolver: Send + Sync {
    fn resolve(&self, pointer: &str) -> Result<Arc<dyn RemoteMap>, Error>;
}

/// Supplies the storage tree of a contract.
#[async_trait]
pub trait StorageSource: Send + Sync {
    async fn fetch_storage(&self, contract: &str) -> Result<StorageValue, Error>;
}

impl StorageValue {
    /// Decode a snapshot document.
    ///
    /// Without a resolver, any `$big_map` in the document is an error.
    pub fn from_json(
        json: JsonValue,
        resolver: Option<&dyn RemoteMapResolver>,
    ) -> Result<Self, Error> {
        Decoder { resolver }.decode(json)
    }
}

struct Decoder<'a> {
    resolver: Option<&'a dyn RemoteMapResolver>,
}

impl Decoder<'_> {
    fn decode(&self, json: JsonValue) -> Result<StorageValue, Error> {
        match json {
            JsonValue::Null => Ok(StorageValue::Null),
            JsonValue::Bool(b) => Ok(StorageValue::Bool(b)),
            JsonValue::Number(n) => Ok(StorageValue::Number(n)),
            JsonValue::String(s) => Ok(StorageValue::String(s)),
            JsonValue::Array(items) => items
                .into_iter()
                .map(|item| self.decode(item))
                .collect::<Result<Vec<_>, _>>()
                .map(StorageValue::Array),
            JsonValue::Object(mut fields) => {
                if fields.len() == 1 {
                    for tag in [MAP_TAG, BIG_MAP_TAG, INT_TAG, BYTES_TAG] {
                        if let Some(body) = fields.remove(tag) {
                            return self.decode_tagged(tag, body);
                        }
                    }
                }

                let mut object = indexmap::IndexMap::with_capacity(fields.len());
                for (name, value) in fields {
                    object.insert(name, self.decode(value)?);
                }
                Ok(StorageValue::Object(object))
            }
        }
    }

    fn decode_tagged(&self, tag: &str, body: JsonValue) -> Result<StorageValue, Error> {
        match tag {
            MAP_TAG => self.decode_map(body),
            BIG_MAP_TAG => self.decode_big_map(body),
            INT_TAG => decode_int(body),
            _ => decode_bytes(body),
        }
    }

    fn decode_map(&self, body: JsonValue) -> Result<StorageValue, Error> {
        let JsonValue::Array(entries) = body else {
            return Err(Error::snapshot("$map must hold an array of entries"));
        };

        let mut map = InMemoryMap::new();
        for entry in entries {
            let JsonValue::Object(mut entry) = entry else {
                return Err(Error::snapshot("$map entries must be objects"));
            };
            let key = entry
                .get("key")
                .and_then(MapKey::from_json)
                .ok_or_else(|| Error::snapshot("$map entry has no usable key"))?;
            let value = self.decode(entry.remove("value").unwrap_or(JsonValue::Null))?;
            map.insert(key, value);
        }
        Ok(StorageValue::Map(map))
    }

    fn decode_big_map(&self, body: JsonValue) -> Result<StorageValue, Error> {
        let (pointer, size) = match body {
            JsonValue::String(pointer) => (pointer, None),
            JsonValue::Number(pointer) => (pointer.to_string(), None),
            JsonValue::Object(fields) => {
                let pointer = match fields.get("id") {
                    Some(JsonValue::String(id)) => id.clone(),
                    Some(JsonValue::Number(id)) => id.to_string(),
                    _ => return Err(Error::snapshot("$big_map needs an id")),
                };
                (pointer, fields.get("size").and_then(JsonValue::as_u64))
            }
            _ => return Err(Error::snapshot("$big_map must be a pointer or an object")),
        };

        let resolver = self.resolver.ok_or_else(|| {
            Error::snapshot(format!(
                "big map {} found but no remote map resolver is configured",
                pointer
            ))
        })?;
        let map = resolver.resolve(&pointer)?;
        Ok(StorageValue::BigMap(BigMapHandle::new(map, size)))
    }
}

fn decode_int(body: JsonValue) -> Result<StorageValue, Error> {
    let digits = match body {
        JsonValue::String(digits) => digits,
        JsonValue::Number(n) => n.to_string(),
        _ => return Err(Error::snapshot("$int must be a decimal string")),
    };
    digits
        .parse::<BigInt>()
        .map(StorageValue::BigInt)
        .map_err(|e| Error::snapshot(format!("invalid $int '{}': {}", digits, e)))
}

fn decode_bytes(body: JsonValue) -> Result<StorageValue, Error> {
    let JsonValue::String(digits) = body else {
        return Err(Error::snapshot("$bytes must be a hex string"));
    };
    hex::decode(&digits)
        .map(StorageValue::Bytes)
        .map_err(|e| Error::snapshot(format!("invalid $bytes '{}': {}", digits, e)))
}

/// Snapshot documents kept in memory, keyed by contract address.
///
/// Each fetch decodes the stored document again, so every request gets its
/// own storage tree.
#[derive(Default)]
pub struct SnapshotStore {
    documents: HashMap<String, JsonValue>,
    resolver: Option<Arc<dyn RemoteMapResolver>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve big map pointers of every snapshot through `resolver`.
    pub fn with_resolver(mut self, resolver: Arc<dyn RemoteMapResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn insert(&mut self, contract: impl Into<String>, document: JsonValue) {
        self.documents.insert(contract.into(), document);
    }

    pub fn contains(&self, contract: &str) -> bool {
        self.documents.contains_key(contract)
    }
}

#[async_trait]
impl StorageSource for SnapshotStore {
    async fn fetch_storage(&self, contract: &str) -> Result<StorageValue, Error> {
        let document = self
            .documents
            .get(contract)
            .cloned()
            .ok_or_else(|| Error::snapshot(format!("no snapshot for contract {}", contract)))?;
        tracing::debug!(contract, "decoding storage snapshot");
        StorageValue::from_json(document, self.resolver.as_deref())
    }
}
