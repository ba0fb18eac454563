//! The result of applying selectors to a storage tree.
//!
//! A projection serializes as a JSON object with one member per selector, in
//! selector order:
//!
//! ```text
//! {
//!   "decimals": 10,
//!   "missing": { "error": "This data field does not exist in the contract storage" },
//!   "ledger": [
//!     { "key": "tz1alice", "value": 100 },
//!     { "key": "tz1bob", "error": "The current map does not contain this key" }
//!   ]
//! }
//! ```

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use storeview_core::MapKey;

/// Why a single field or key could not be projected.
///
/// These are expected outcomes of a well-formed request against a storage
/// that does not have the requested shape. They are reported as data inside
/// the projection and never abort it.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldError {
    #[error("This data field does not exist in the contract storage")]
    FieldNotFound,
    #[error("The current map does not contain this key")]
    KeyNotFound,
    #[error(
        "This data field does not have type MichelsonMap or BigMap, use simple string to access to the properties"
    )]
    TypeMismatch,
}

/// An ordered list of selector results.
///
/// Entries keep the order of the selectors that produced them. Two selectors
/// with the same name produce two entries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Projection {
    entries: Vec<ProjectionEntry>,
}

/// The result of one selector.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionEntry {
    pub key: String,
    pub outcome: FieldOutcome,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldOutcome {
    /// A path selector's normalized value.
    Value(JsonValue),
    /// A container selector's per-key results, in selector entry order.
    Entries(Vec<KeyedEntry>),
    Error(FieldError),
}

/// The result of reading one key from a container.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyedEntry {
    pub key: MapKey,
    pub outcome: EntryOutcome,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EntryOutcome {
    /// The normalized value found under the key.
    Value(JsonValue),
    /// The value found under the key, narrowed by nested selectors.
    Nested(Projection),
    Error(FieldError),
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ProjectionEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProjectionEntry> {
        self.entries.iter()
    }

    /// The first entry reported under `key`.
    pub fn get(&self, key: &str) -> Option<&FieldOutcome> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.outcome)
    }

    /// Convert into a JSON value.
    ///
    /// A JSON object cannot hold the same member twice, so when selectors
    /// repeat a name the later entry wins here. Serialize the projection
    /// directly (`serde_json::to_string`) to keep every entry.
    pub fn to_json(&self) -> JsonValue {
        // Serializing plain JSON values into a Value cannot fail.
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

impl FromIterator<ProjectionEntry> for Projection {
    fn from_iter<I: IntoIterator<Item = ProjectionEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Projection {
    type Item = &'a ProjectionEntry;
    type IntoIter = std::slice::Iter<'a, ProjectionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl ProjectionEntry {
    pub fn value(key: impl Into<String>, value: JsonValue) -> Self {
        Self {
            key: key.into(),
            outcome: FieldOutcome::Value(value),
        }
    }

    pub fn entries(key: impl Into<String>, entries: Vec<KeyedEntry>) -> Self {
        Self {
            key: key.into(),
            outcome: FieldOutcome::Entries(entries),
        }
    }

    pub fn error(key: impl Into<String>, error: FieldError) -> Self {
        Self {
            key: key.into(),
            outcome: FieldOutcome::Error(error),
        }
    }
}

impl KeyedEntry {
    pub fn value(key: MapKey, value: JsonValue) -> Self {
        Self {
            key,
            outcome: EntryOutcome::Value(value),
        }
    }

    pub fn nested(key: MapKey, projection: Projection) -> Self {
        Self {
            key,
            outcome: EntryOutcome::Nested(projection),
        }
    }

    pub fn error(key: MapKey, error: FieldError) -> Self {
        Self {
            key,
            outcome: EntryOutcome::Error(error),
        }
    }
}

/// `{ "error": "<message>" }`
struct ErrorObject(FieldError);

impl Serialize for ErrorObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("error", &self.0.to_string())?;
        map.end()
    }
}

impl Serialize for Projection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.key, &entry.outcome)?;
        }
        map.end()
    }
}

impl Serialize for FieldOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldOutcome::Value(value) => value.serialize(serializer),
            FieldOutcome::Entries(entries) => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for entry in entries {
                    seq.serialize_element(entry)?;
                }
                seq.end()
            }
            FieldOutcome::Error(error) => ErrorObject(*error).serialize(serializer),
        }
    }
}

impl Serialize for KeyedEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("key", &self.key)?;
        match &self.outcome {
            EntryOutcome::Value(value) => map.serialize_entry("value", value)?,
            EntryOutcome::Nested(projection) => map.serialize_entry("value", projection)?,
            EntryOutcome::Error(error) => map.serialize_entry("error", &error.to_string())?,
        }
        map.end()
    }
}
