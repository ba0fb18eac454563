//! Field projection over contract storage.
//!
//! Given a storage tree and a list of selectors, `Projector` builds a
//! `Projection`: one entry per selector, holding either the normalized value
//! it picked or a per-field error. Map lookups of sibling selectors run
//! concurrently; output order is always selector order.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use storeview_core::{selector, StorageValue};
//! use storeview_engine::Projector;
//!
//! let storage = StorageValue::from_json(
//!     json!({
//!         "decimals": 10,
//!         "ledger": { "$map": [ { "key": "tz1alice", "value": 100 } ] }
//!     }),
//!     None,
//! )
//! .unwrap();
//! let selectors = selector::from_value(json!([
//!     "decimals",
//!     { "ledger": [ { "key": "tz1alice" }, { "key": "tz1bob" } ] }
//! ]))
//! .unwrap();
//!
//! let projection = futures::executor::block_on(
//!     Projector::default().project(&selectors, &storage),
//! )
//! .unwrap();
//!
//! assert_eq!(
//!     projection.to_json(),
//!     json!({
//!         "decimals": 10,
//!         "ledger": [
//!             { "key": "tz1alice", "value": 100 },
//!             { "key": "tz1bob", "error": "The current map does not contain this key" }
//!         ]
//!     })
//! );
//! ```

mod evaluator;
mod projection;

pub use evaluator::{Projector, ProjectorOptions};
pub use projection::{
    EntryOutcome, FieldError, FieldOutcome, KeyedEntry, Projection, ProjectionEntry,
};
