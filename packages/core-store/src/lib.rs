//! Core storeview: the contract storage model
//!
//! This layer describes what a contract storage snapshot looks like and how
//! callers ask for parts of it:
//! - `StorageValue`: the storage tree (scalars, objects, maps, big maps)
//! - `MapKey`: scalar or composite keys used to look into maps
//! - `KeyedContainer`: one async lookup contract over in-memory and remote maps
//! - `Selector`: the declarative field selection grammar
//! - `normalize`: conversion of storage values into plain JSON
//!
//! # Example
//!
//! ```rust
//! use storeview_core::{normalize, FieldPath, NormalizeOptions, StorageValue};
//!
//! let storage = StorageValue::from_json(
//!     serde_json::json!({ "admin": { "address": "tz1abc" } }),
//!     None,
//! )
//! .unwrap();
//!
//! let admin = storage.get(&FieldPath::parse("admin.address")).unwrap();
//! let json = normalize(admin, &NormalizeOptions::default()).unwrap();
//! assert_eq!(json, serde_json::json!("tz1abc"));
//! ```

mod container;
mod error;
mod in_memory;
mod key;
pub mod normalize;
mod path;
pub mod selector;
pub mod snapshot;
mod value;

pub use container::{BigMapHandle, KeyedContainer, RemoteMap};
pub use error::Error;
pub use in_memory::InMemoryMap;
pub use key::MapKey;
pub use normalize::{normalize, BigIntPolicy, NormalizeOptions};
pub use path::FieldPath;
pub use selector::{EntrySelector, Selector};
pub use snapshot::{RemoteMapResolver, SnapshotStore, StorageSource};
pub use value::StorageValue;

// Re-exported so downstream crates build big integers without a direct dependency.
pub use bigdecimal::num_bigint::BigInt;
