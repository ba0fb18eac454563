//! Conversion of storage values into plain JSON.
//!
//! Normalization is what callers actually see of a storage tree:
//!
//! ```text
//! big map          -> { "type": "big_map", "value": "<pointer>", "size"?: n }
//! map              -> [ { "key": k, "value": v }, ... ]   (map order)
//! big integer      -> JSON number (see BigIntPolicy)
//! bytes            -> lowercase hex string
//! array / object   -> normalized element by element, order kept
//! anything else    -> as is
//! ```
//!
//! Big maps are never expanded: their size is unbounded and every entry would
//! cost a remote fetch.

use std::fmt;
use std::str::FromStr;

use bigdecimal::num_bigint::BigInt;
use bigdecimal::ToPrimitive;
use serde_json::{json, Map as JsonMap, Number, Value as JsonValue};

use crate::{BigMapHandle, Error, InMemoryMap, StorageValue};

/// The `type` tag of a normalized big map.
pub const BIG_MAP_TYPE: &str = "big_map";

/// What to do with big integers that do not fit a 64-bit JSON number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BigIntPolicy {
    /// Emit the nearest floating point number and log the precision loss.
    #[default]
    Lossy,
    /// Refuse the value; the whole projection fails.
    Strict,
    /// Emit the exact decimal digits as a string.
    String,
}

impl fmt::Display for BigIntPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BigIntPolicy::Lossy => "lossy",
            BigIntPolicy::Strict => "strict",
            BigIntPolicy::String => "string",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for BigIntPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lossy" => Ok(BigIntPolicy::Lossy),
            "strict" => Ok(BigIntPolicy::Strict),
            "string" => Ok(BigIntPolicy::String),
            other => Err(format!(
                "unknown big integer policy '{}', expected lossy, strict or string",
                other
            )),
        }
    }
}

/// Knobs for `normalize`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub big_int: BigIntPolicy,
}

impl NormalizeOptions {
    pub fn with_big_int(mut self, policy: BigIntPolicy) -> Self {
        self.big_int = policy;
        self
    }
}

/// Convert a storage value into JSON.
///
/// Pure and side-effect free apart from diagnostics. The only failure is a
/// big integer the configured policy cannot represent.
pub fn normalize(value: &StorageValue, options: &NormalizeOptions) -> Result<JsonValue, Error> {
    match value {
        StorageValue::Null => Ok(JsonValue::Null),
        StorageValue::Bool(b) => Ok(JsonValue::Bool(*b)),
        StorageValue::Number(n) => Ok(JsonValue::Number(n.clone())),
        StorageValue::BigInt(n) => big_int(n, options.big_int),
        StorageValue::String(s) => Ok(JsonValue::String(s.clone())),
        StorageValue::Bytes(bytes) => Ok(JsonValue::String(hex::encode(bytes))),
        StorageValue::Array(items) => items
            .iter()
            .map(|item| normalize(item, options))
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array),
        StorageValue::Object(fields) => {
            let mut object = JsonMap::with_capacity(fields.len());
            for (name, field) in fields {
                object.insert(name.clone(), normalize(field, options)?);
            }
            Ok(JsonValue::Object(object))
        }
        StorageValue::Map(map) => map_entries(map, options),
        StorageValue::BigMap(handle) => Ok(big_map(handle)),
    }
}

/// The `{ key, value }` list of an in-memory map, in map order.
pub fn map_entries(map: &InMemoryMap, options: &NormalizeOptions) -> Result<JsonValue, Error> {
    map.iter()
        .map(|(key, value)| {
            Ok(json!({
                "key": key.to_json(),
                "value": normalize(value, options)?,
            }))
        })
        .collect::<Result<Vec<_>, Error>>()
        .map(JsonValue::Array)
}

fn big_map(handle: &BigMapHandle) -> JsonValue {
    let mut object = JsonMap::new();
    object.insert("type".to_string(), JsonValue::from(BIG_MAP_TYPE));
    object.insert("value".to_string(), JsonValue::from(handle.pointer()));
    if let Some(size) = handle.size() {
        object.insert("size".to_string(), JsonValue::from(size));
    }
    JsonValue::Object(object)
}

/// Narrow a big integer to a JSON value according to `policy`.
pub fn big_int(n: &BigInt, policy: BigIntPolicy) -> Result<JsonValue, Error> {
    if let Some(small) = n.to_i64() {
        return Ok(JsonValue::from(small));
    }
    if let Some(small) = n.to_u64() {
        return Ok(JsonValue::from(small));
    }

    match policy {
        BigIntPolicy::Lossy => {
            // Beyond f64 range the conversion saturates at the largest finite value.
            let approx = n
                .to_f64()
                .map(|f| if f.is_infinite() { f64::MAX.copysign(f) } else { f })
                .and_then(Number::from_f64)
                .ok_or_else(|| Error::normalize(format!("{} has no finite number form", n)))?;
            tracing::warn!(
                value = %n,
                approx = %approx,
                "big integer exceeds 64-bit range, converted with precision loss"
            );
            Ok(JsonValue::Number(approx))
        }
        BigIntPolicy::Strict => Err(Error::normalize(format!(
            "{} does not fit a 64-bit integer",
            n
        ))),
        BigIntPolicy::String => Ok(JsonValue::String(n.to_string())),
    }
}
