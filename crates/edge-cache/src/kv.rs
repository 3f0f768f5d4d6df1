//! Spin key-value store backend.

use async_trait::async_trait;

use crate::entry::CachedResponse;
use crate::error::{CacheError, CacheResult};
use crate::key::CacheKey;
use crate::store::CacheStore;

/// Cache store backed by a Spin key-value store.
///
/// The store has no native expiry, so entries carry their own freshness
/// window and [`crate::EdgeCache`] enforces it on read.
pub struct KeyValueStore {
    store: spin_sdk::key_value::Store,
}

impl KeyValueStore {
    /// Open a key-value store by label.
    pub fn open(label: &str) -> CacheResult<Self> {
        let store = spin_sdk::key_value::Store::open(label)
            .map_err(|e| CacheError::Open(e.to_string()))?;
        Ok(Self { store })
    }
}

#[async_trait(?Send)]
impl CacheStore for KeyValueStore {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CachedResponse>> {
        match self.store.get(key.as_str()) {
            Ok(Some(bytes)) => CachedResponse::from_bytes(&bytes).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(CacheError::Storage(e.to_string())),
        }
    }

    async fn put(&self, key: &CacheKey, entry: CachedResponse) -> CacheResult<()> {
        let bytes = entry.to_bytes()?;
        self.store
            .set(key.as_str(), &bytes)
            .map_err(|e| CacheError::Storage(e.to_string()))
    }
}
