//! Dot-delimited paths into nested storage objects.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A path into plain nested objects of a storage tree.
///
/// Components are separated by `.`; a numeric component indexes into an
/// array. Paths never descend into maps or big maps: those are reached
/// through container selectors.
///
/// Parsing never fails. Components that match nothing simply resolve to
/// nothing, which the engine reports as a missing field.
///
/// # Examples
///
/// ```rust
/// use storeview_core::FieldPath;
///
/// let path = FieldPath::parse("address.requesterAddress");
/// assert_eq!(path.len(), 2);
/// assert_eq!(path.to_string(), "address.requesterAddress");
/// ```
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    components: Vec<String>,
}

impl FieldPath {
    pub fn parse(s: &str) -> Self {
        let components = if s.is_empty() {
            Vec::new()
        } else {
            s.split('.').map(str::to_owned).collect()
        };

        FieldPath {
            raw: s.to_string(),
            components,
        }
    }

    /// The path exactly as the caller wrote it.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.components.iter()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        FieldPath::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D>(deserializer: D) -> Result<FieldPath, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        Ok(FieldPath::parse(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_components() {
        let path = FieldPath::parse("a.b.0");
        let components: Vec<&str> = path.iter().map(String::as_str).collect();
        assert_eq!(components, vec!["a", "b", "0"]);
    }

    #[test]
    fn empty_path() {
        let path = FieldPath::parse("");
        assert!(path.is_empty());
        assert_eq!(path.as_str(), "");
    }

    #[test]
    fn empty_components_are_kept() {
        // "a..b" has an empty middle component that can never match a field.
        assert_eq!(FieldPath::parse("a..b").len(), 3);
    }

    #[test]
    fn serde_as_string() {
        let path: FieldPath = serde_json::from_str("\"jwtToken.createdAt\"").unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(
            serde_json::to_string(&path).unwrap(),
            "\"jwtToken.createdAt\""
        );
    }
}
