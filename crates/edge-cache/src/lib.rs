//! Caching infrastructure for the edge proxy platform.
//!
//! This crate provides:
//! - `CacheKey` - Synthetic per-species cache identities
//! - `CachedResponse` - Stored body and headers with a freshness window
//! - `CacheStore` - Backend trait (`KeyValueStore` on Spin, `InMemoryStore` locally)
//! - `EdgeCache` - Best-effort lookup and deferred population
//! - `EdgeCachePolicy` - Independent browser and edge lifetimes
//!
//! # Example
//!
//! ```ignore
//! use edge_cache::{CacheKey, EdgeCache, EdgeCachePolicy, KeyValueStore};
//!
//! let cache = EdgeCache::new(KeyValueStore::open("default")?);
//! let policy = EdgeCachePolicy::default();
//! let key = CacheKey::for_species("Turdus merula");
//!
//! if let Some(hit) = cache.lookup(&key).await {
//!     return respond(hit.body);
//! }
//!
//! // Schedule the write; it runs after the response is sent
//! tasks.spawn(cache.store(key, body, headers, policy.edge_ttl()));
//! ```

mod entry;
mod error;
mod headers;
mod key;
#[cfg(target_arch = "wasm32")]
mod kv;
mod policy;
mod store;

pub use entry::*;
pub use error::*;
pub use headers::*;
#[cfg(target_arch = "wasm32")]
pub use kv::*;
pub use key::*;
pub use policy::*;
pub use store::*;
