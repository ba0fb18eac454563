//! The field selection grammar.
//!
//! A selector list is what a caller sends to pick parts of a contract
//! storage. On the wire it is a JSON array whose items are either:
//!
//! ```text
//! "path.to.field"                                  -> Selector::Path
//! { "ledger": [ { "key": <key>, "dataFields": [...] } ] }  -> Selector::Container
//! ```
//!
//! The wire shape is decided once, at decode time. Blank items (`""`, `{}`)
//! are dropped while decoding; the engine also skips blank selectors built in
//! code.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::{FieldPath, MapKey};

/// One requested field of a storage tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Selector {
    /// Read a field of plain nested objects.
    Path(FieldPath),
    /// Look keys up in the map stored under `name`.
    Container {
        name: String,
        entries: Vec<EntrySelector>,
    },
}

impl Selector {
    pub fn path(path: &str) -> Self {
        Selector::Path(FieldPath::parse(path))
    }

    pub fn container(name: impl Into<String>, entries: Vec<EntrySelector>) -> Self {
        Selector::Container {
            name: name.into(),
            entries,
        }
    }

    /// A selector that asks for nothing and yields no output entry.
    ///
    /// Only an empty path is blank. A container naming the empty field still
    /// asks for something, and gets reported as a missing field.
    pub fn is_blank(&self) -> bool {
        match self {
            Selector::Path(path) => path.is_empty(),
            Selector::Container { .. } => false,
        }
    }

    /// The name the selector's result is reported under.
    pub fn name(&self) -> &str {
        match self {
            Selector::Path(path) => path.as_str(),
            Selector::Container { name, .. } => name,
        }
    }
}

/// One key to read from a container, optionally with selectors to apply to
/// the value found under it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntrySelector {
    pub key: MapKey,
    #[serde(rename = "dataFields", default, deserialize_with = "deserialize_nested")]
    pub selectors: Option<Vec<Selector>>,
}

impl EntrySelector {
    pub fn new(key: impl Into<MapKey>) -> Self {
        Self {
            key: key.into(),
            selectors: None,
        }
    }

    pub fn with_selectors(mut self, selectors: Vec<Selector>) -> Self {
        self.selectors = Some(selectors);
        self
    }
}

/// Wire form of a single selector item.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelector {
    Path(String),
    Container(IndexMap<String, Vec<EntrySelector>>),
}

impl RawSelector {
    fn into_selector<E: serde::de::Error>(self) -> Result<Option<Selector>, E> {
        match self {
            RawSelector::Path(path) if path.is_empty() => Ok(None),
            RawSelector::Path(path) => Ok(Some(Selector::path(&path))),
            RawSelector::Container(fields) => {
                if fields.len() > 1 {
                    return Err(E::custom(format!(
                        "a container selector must name exactly one field, got {}",
                        fields.len()
                    )));
                }
                Ok(fields
                    .into_iter()
                    .next()
                    .map(|(name, entries)| Selector::Container { name, entries }))
            }
        }
    }
}

fn decode_list<E: serde::de::Error>(raw: Vec<RawSelector>) -> Result<Vec<Selector>, E> {
    let mut selectors = Vec::with_capacity(raw.len());
    for item in raw {
        if let Some(selector) = item.into_selector()? {
            selectors.push(selector);
        }
    }
    Ok(selectors)
}

fn deserialize_nested<'de, D>(deserializer: D) -> Result<Option<Vec<Selector>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<RawSelector>> = Deserialize::deserialize(deserializer)?;
    raw.map(decode_list::<D::Error>).transpose()
}

/// Decode a selector list from a JSON value.
pub fn from_value(json: serde_json::Value) -> Result<Vec<Selector>, serde_json::Error> {
    let raw: Vec<RawSelector> = serde_json::from_value(json)?;
    decode_list::<serde_json::Error>(raw)
}

/// Decode a selector list from JSON text.
pub fn from_str(json: &str) -> Result<Vec<Selector>, serde_json::Error> {
    let raw: Vec<RawSelector> = serde_json::from_str(json)?;
    decode_list::<serde_json::Error>(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_path_and_container() {
        let selectors = from_value(json!([
            "decimals",
            { "ledger": [ { "key": "tz1alice" }, { "key": 3 } ] }
        ]))
        .unwrap();

        assert_eq!(selectors.len(), 2);
        assert_eq!(selectors[0], Selector::path("decimals"));
        match &selectors[1] {
            Selector::Container { name, entries } => {
                assert_eq!(name, "ledger");
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].key, MapKey::from("tz1alice"));
                assert!(entries[0].selectors.is_none());
            }
            other => panic!("expected container selector, got {:?}", other),
        }
    }

    #[test]
    fn decode_nested_data_fields() {
        let selectors = from_str(
            r#"[{ "accessRequests": [ {
                "key": { "scopeId": "scope1", "status": "status1" },
                "dataFields": [ "address.requesterAddress", "", "jwtToken" ]
            } ] }]"#,
        )
        .unwrap();

        let Selector::Container { entries, .. } = &selectors[0] else {
            panic!("expected container selector");
        };
        let nested = entries[0].selectors.as_ref().unwrap();
        assert_eq!(
            nested,
            &vec![
                Selector::path("address.requesterAddress"),
                Selector::path("jwtToken")
            ]
        );
    }

    #[test]
    fn blank_items_are_dropped() {
        let selectors = from_value(json!(["", {}, "a"])).unwrap();
        assert_eq!(selectors, vec![Selector::path("a")]);
    }

    #[test]
    fn empty_container_name_is_kept() {
        let selectors = from_value(json!([{ "": [ { "key": "x" } ] }, "a"])).unwrap();
        assert_eq!(selectors.len(), 2);
        assert_eq!(
            selectors[0],
            Selector::container("", vec![EntrySelector::new("x")])
        );
        assert!(!selectors[0].is_blank());
    }

    #[test]
    fn multi_field_object_is_rejected() {
        let err = from_value(json!([{ "a": [], "b": [] }])).unwrap_err();
        assert!(err.to_string().contains("exactly one field"));
    }

    #[test]
    fn entry_without_key_is_rejected() {
        assert!(from_value(json!([{ "ledger": [ { "dataFields": ["a"] } ] }])).is_err());
    }

    #[test]
    fn entry_with_unknown_field_is_rejected() {
        assert!(from_value(json!([{ "ledger": [ { "key": "a", "other": 1 } ] }])).is_err());
    }

    #[test]
    fn blank_selectors_built_in_code() {
        assert!(Selector::path("").is_blank());
        assert!(!Selector::container("", vec![]).is_blank());
        assert!(!Selector::container("ledger", vec![]).is_blank());
        assert_eq!(Selector::container("ledger", vec![]).name(), "ledger");
    }
}
