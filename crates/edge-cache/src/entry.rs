//! Cached response entries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

/// A cached upstream response.
///
/// The body is opaque: it is stored and returned byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// Response body.
    pub body: Vec<u8>,
    /// Response headers, in insertion order.
    pub headers: Vec<(String, String)>,
    /// When the entry was stored (seconds since epoch).
    pub stored_at: i64,
    /// Edge freshness window in seconds.
    pub ttl_secs: u64,
}

/// Metadata written ahead of the body in the encoded form.
#[derive(Serialize, Deserialize)]
struct EntryMeta {
    headers: Vec<(String, String)>,
    stored_at: i64,
    ttl_secs: u64,
}

impl CachedResponse {
    /// Create an entry stored now.
    pub fn new(body: Vec<u8>, headers: Vec<(String, String)>, ttl: Duration) -> Self {
        Self {
            body,
            headers,
            stored_at: current_timestamp(),
            ttl_secs: ttl.as_secs(),
        }
    }

    /// Check if the entry is still fresh at `now` (seconds since epoch).
    pub fn is_fresh_at(&self, now: i64) -> bool {
        let expires_at = self
            .stored_at
            .saturating_add(i64::try_from(self.ttl_secs).unwrap_or(i64::MAX));
        now < expires_at
    }

    /// Check if the entry is still fresh.
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(current_timestamp())
    }

    /// Get age in seconds.
    pub fn age(&self) -> u64 {
        u64::try_from(current_timestamp().saturating_sub(self.stored_at)).unwrap_or(0)
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        crate::headers::get_header(&self.headers, name)
    }

    /// Encode for a byte-oriented store.
    ///
    /// Layout: one line of JSON metadata, `\n`, then the raw body.
    pub fn to_bytes(&self) -> CacheResult<Vec<u8>> {
        let meta = serde_json::to_vec(&EntryMeta {
            headers: self.headers.clone(),
            stored_at: self.stored_at,
            ttl_secs: self.ttl_secs,
        })?;

        let mut bytes = Vec::with_capacity(meta.len() + 1 + self.body.len());
        bytes.extend_from_slice(&meta);
        bytes.push(b'\n');
        bytes.extend_from_slice(&self.body);
        Ok(bytes)
    }

    /// Decode bytes produced by [`CachedResponse::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> CacheResult<Self> {
        let split = bytes
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| CacheError::Serialization("missing entry header".to_string()))?;

        let meta: EntryMeta = serde_json::from_slice(&bytes[..split])?;

        Ok(Self {
            body: bytes[split + 1..].to_vec(),
            headers: meta.headers,
            stored_at: meta.stored_at,
            ttl_secs: meta.ttl_secs,
        })
    }
}

/// Current time in seconds since epoch.
pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
