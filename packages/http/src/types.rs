use serde::Deserialize;

fn active_by_default() -> bool {
    true
}

/// A big map key as the indexer reports it.
///
/// Only the fields the lookup needs; the indexer sends more (level, hash,
/// update counters) which are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BigMapKey {
    #[serde(default)]
    pub key: serde_json::Value,

    #[serde(default)]
    pub value: serde_json::Value,

    /// `false` once the key has been removed from the map.
    #[serde(default = "active_by_default")]
    pub active: bool,
}
