//! Big map lookups against a TzKT-style indexer.
//!
//! # Request Model
//!
//! ```text
//! GET {base_url}/v1/bigmaps/{pointer}/keys/{key}
//!
//! 200 + active key    -> value
//! 200 + removed key   -> not found
//! 204, 404            -> not found
//! 502                 -> retried, up to retry_attempts more times
//! anything else       -> error
//! ```
//!
//! Scalar keys travel as their text, composite keys as compact JSON. Both are
//! percent-encoded as a single path segment.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use storeview_core::{
    Error as CoreError, KeyedContainer, MapKey, RemoteMap, RemoteMapResolver, StorageValue,
};

use crate::config::IndexerConfig;
use crate::error::Error;
use crate::types::BigMapKey;

/// HTTP access to the indexer's big map endpoints.
///
/// Cloning is cheap: clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct IndexerClient {
    client: Client,
    base_url: Url,
    retry_attempts: u32,
}

impl IndexerClient {
    pub fn new(config: &IndexerConfig) -> Result<Self, Error> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl {
                message: format!("{} cannot carry a path", config.base_url),
            });
        }
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url,
            retry_attempts: config.retry_attempts,
        })
    }

    /// A big map handle whose lookups go through this client.
    pub fn big_map(&self, pointer: impl Into<String>) -> IndexerBigMap {
        IndexerBigMap {
            client: self.clone(),
            pointer: pointer.into(),
        }
    }

    fn key_url(&self, pointer: &str, key: &MapKey) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl {
                message: format!("{} cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(["v1", "bigmaps", pointer, "keys", &key.to_request_text()]);
        Ok(url)
    }

    /// The raw JSON value stored under `key`, or `None` if the key is absent
    /// or has been removed.
    pub async fn get_key(
        &self,
        pointer: &str,
        key: &MapKey,
    ) -> Result<Option<serde_json::Value>, Error> {
        let url = self.key_url(pointer, key)?;
        let mut remaining = self.retry_attempts;

        loop {
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();

            match status {
                StatusCode::OK => {
                    let body = response.bytes().await?;
                    if body.iter().all(u8::is_ascii_whitespace) {
                        return Ok(None);
                    }
                    let entry: Option<BigMapKey> = serde_json::from_slice(&body)?;
                    return Ok(entry.filter(|entry| entry.active).map(|entry| entry.value));
                }
                StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => return Ok(None),
                StatusCode::BAD_GATEWAY if remaining > 0 => {
                    remaining -= 1;
                    tracing::error!(
                        big_map = pointer,
                        key = %key,
                        remaining,
                        "indexer answered 502, retrying"
                    );
                }
                _ => {
                    tracing::error!(
                        big_map = pointer,
                        key = %key,
                        status = status.as_u16(),
                        "big map lookup failed"
                    );
                    return Err(Error::Status {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
            }
        }
    }
}

/// A big map whose entries are read from the indexer on demand.
#[derive(Clone, Debug)]
pub struct IndexerBigMap {
    client: IndexerClient,
    pointer: String,
}

#[async_trait]
impl KeyedContainer for IndexerBigMap {
    async fn try_get(&self, key: &MapKey) -> Result<Option<StorageValue>, CoreError> {
        tracing::debug!(big_map = %self.pointer, key = %key, "fetching big map key");
        match self.client.get_key(&self.pointer, key).await? {
            Some(value) => StorageValue::from_json(value, None).map(Some),
            None => Ok(None),
        }
    }
}

impl RemoteMap for IndexerBigMap {
    fn pointer(&self) -> &str {
        &self.pointer
    }
}

/// Resolves every big map of a snapshot to an `IndexerBigMap` sharing one
/// HTTP client.
#[derive(Clone, Debug)]
pub struct IndexerResolver {
    client: IndexerClient,
}

impl IndexerResolver {
    pub fn new(config: &IndexerConfig) -> Result<Self, Error> {
        Ok(Self {
            client: IndexerClient::new(config)?,
        })
    }

    pub fn client(&self) -> &IndexerClient {
        &self.client
    }
}

impl RemoteMapResolver for IndexerResolver {
    fn resolve(&self, pointer: &str) -> Result<Arc<dyn RemoteMap>, CoreError> {
        Ok(Arc::new(self.client.big_map(pointer)))
    }
}
