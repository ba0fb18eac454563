//! # storeview-http
//!
//! Big maps backed by a blockchain indexer.
//!
//! Snapshots only carry big map pointers. `IndexerResolver` turns each pointer
//! into an `IndexerBigMap` that fetches entries over HTTP, one request per key:
//!
//! ```ignore
//! use std::sync::Arc;
//! use storeview_core::SnapshotStore;
//! use storeview_http::{IndexerConfig, IndexerResolver};
//!
//! let resolver = IndexerResolver::new(&IndexerConfig::from_env()?)?;
//! let mut store = SnapshotStore::new().with_resolver(Arc::new(resolver));
//! store.insert("KT1...", snapshot_json);
//! ```

pub mod config;
pub mod error;
pub mod types;

mod indexer;

pub use config::IndexerConfig;
pub use error::Error;
pub use indexer::{IndexerBigMap, IndexerClient, IndexerResolver};
pub use types::BigMapKey;
