//! Browser and edge cache policies.

use std::time::Duration;

use edge_core::CacheConfig;

/// A shared-cache lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Time-to-live.
    pub ttl: Duration,
}

impl CachePolicy {
    /// Create a public cache policy.
    pub fn public(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Generate Cache-Control header value.
    pub fn cache_control_header(&self) -> String {
        format!("public, max-age={}", self.ttl.as_secs())
    }
}

/// The two independent lifetimes of a proxied response.
///
/// Browsers are told one `max-age`; the edge copy is kept for its own,
/// usually longer, window. Neither bounds the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeCachePolicy {
    /// Directive sent to clients.
    pub browser: CachePolicy,
    /// Directive stored with edge entries, and their freshness window.
    pub edge: CachePolicy,
}

impl EdgeCachePolicy {
    /// Create from explicit lifetimes.
    pub fn new(browser_ttl: Duration, edge_ttl: Duration) -> Self {
        Self {
            browser: CachePolicy::public(browser_ttl),
            edge: CachePolicy::public(edge_ttl),
        }
    }

    /// Create from workload configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            Duration::from_secs(config.browser_max_age_secs),
            Duration::from_secs(config.edge_max_age_secs),
        )
    }

    /// `Cache-Control` for client responses.
    pub fn browser_cache_control(&self) -> String {
        self.browser.cache_control_header()
    }

    /// `Cache-Control` stored with edge entries.
    pub fn edge_cache_control(&self) -> String {
        self.edge.cache_control_header()
    }

    /// Freshness window of edge entries.
    pub fn edge_ttl(&self) -> Duration {
        self.edge.ttl
    }
}

impl Default for EdgeCachePolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
