//! Edge cache store access.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;

use crate::entry::{current_timestamp, CachedResponse};
use crate::error::{CacheError, CacheResult};
use crate::key::CacheKey;

/// Backing store for cached responses.
///
/// Implementations are shared, process-external stores: absence of an entry
/// says nothing about whether it was ever written.
#[async_trait(?Send)]
pub trait CacheStore {
    /// Get a cached response.
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CachedResponse>>;

    /// Store a response, replacing any previous entry for the key.
    async fn put(&self, key: &CacheKey, entry: CachedResponse) -> CacheResult<()>;
}

/// Best-effort accessor over a [`CacheStore`].
///
/// Lookups never fail: backend errors, undecodable entries and entries past
/// their freshness window all read as absent. Stores are returned as futures
/// for the caller to schedule after the response, and their failures are
/// logged and dropped.
pub struct EdgeCache<S> {
    store: Rc<S>,
}

impl<S> Clone for EdgeCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: Rc::clone(&self.store),
        }
    }
}

impl<S: CacheStore + 'static> EdgeCache<S> {
    /// Create an accessor owning `store`.
    pub fn new(store: S) -> Self {
        Self {
            store: Rc::new(store),
        }
    }

    /// Create an accessor over a shared store.
    pub fn from_shared(store: Rc<S>) -> Self {
        Self { store }
    }

    /// Look up a fresh entry.
    pub async fn lookup(&self, key: &CacheKey) -> Option<CachedResponse> {
        match self.store.get(key).await {
            Ok(Some(entry)) if entry.is_fresh() => Some(entry),
            Ok(Some(entry)) => {
                tracing::debug!(key = %key, age_secs = entry.age(), "cache entry expired");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache lookup failed, treating as miss");
                None
            }
        }
    }

    /// Build the write of a new entry.
    ///
    /// Nothing happens until the returned future is polled. It completes
    /// regardless of the outcome.
    pub fn store(
        &self,
        key: CacheKey,
        body: Vec<u8>,
        headers: Vec<(String, String)>,
        ttl: Duration,
    ) -> impl Future<Output = ()> + 'static {
        let store = Rc::clone(&self.store);
        let entry = CachedResponse::new(body, headers, ttl);

        async move {
            match store.put(&key, entry).await {
                Ok(()) => tracing::debug!(key = %key, "cache entry stored"),
                Err(e) => tracing::warn!(key = %key, error = %e, "cache store failed"),
            }
        }
    }
}

/// In-memory store for local development and tests.
///
/// Entries go through the same byte encoding as the platform store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RefCell<HashMap<String, Vec<u8>>>,
    fail_writes: Cell<bool>,
    fail_reads: Cell<bool>,
    writes: Cell<usize>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Make every subsequent read fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Decode the entry for `key`, bypassing freshness checks.
    pub fn entry(&self, key: &CacheKey) -> Option<CachedResponse> {
        self.entries
            .borrow()
            .get(key.as_str())
            .and_then(|bytes| CachedResponse::from_bytes(bytes).ok())
    }

    /// Insert raw bytes under `key`.
    pub fn insert_raw(&self, key: &CacheKey, bytes: Vec<u8>) {
        self.entries
            .borrow_mut()
            .insert(key.as_str().to_string(), bytes);
    }
}

#[async_trait(?Send)]
impl CacheStore for InMemoryStore {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CachedResponse>> {
        if self.fail_reads.get() {
            return Err(CacheError::Storage("reads disabled".to_string()));
        }

        match self.entries.borrow().get(key.as_str()) {
            Some(bytes) => CachedResponse::from_bytes(bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &CacheKey, entry: CachedResponse) -> CacheResult<()> {
        if self.fail_writes.get() {
            return Err(CacheError::Storage("writes disabled".to_string()));
        }

        let bytes = entry.to_bytes()?;
        self.entries
            .borrow_mut()
            .insert(key.as_str().to_string(), bytes);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}
