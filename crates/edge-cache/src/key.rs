//! Cache key derivation.

use serde::{Deserialize, Serialize};

/// Authority of synthetic cache keys. Keys are never dereferenced.
pub const CACHE_KEY_BASE: &str = "https://cache.local/";

/// A cache key uniquely identifying a cached response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    key: String,
}

impl CacheKey {
    /// Create a cache key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Key for a species lookup.
    ///
    /// The species is appended verbatim as a path segment: no escaping,
    /// case folding or trimming. Distinct species values always give
    /// distinct keys, and the empty species is a key of its own.
    pub fn for_species(species: &str) -> Self {
        let mut key = String::with_capacity(CACHE_KEY_BASE.len() + species.len());
        key.push_str(CACHE_KEY_BASE);
        key.push_str(species);
        Self { key }
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_species_key_shape() {
        let key = CacheKey::for_species("Turdus merula");
        assert_eq!(key.as_str(), "https://cache.local/Turdus merula");
        assert_eq!(key.to_string(), "https://cache.local/Turdus merula");
    }

    #[test]
    fn test_same_species_same_key() {
        assert_eq!(
            CacheKey::for_species("Parus major"),
            CacheKey::for_species("Parus major")
        );
    }

    #[test]
    fn test_keys_are_case_and_encoding_sensitive() {
        assert_ne!(
            CacheKey::for_species("parus major"),
            CacheKey::for_species("Parus major")
        );
        assert_ne!(
            CacheKey::for_species("Parus%20major"),
            CacheKey::for_species("Parus major")
        );
    }

    #[test]
    fn test_empty_species_is_distinct() {
        let key = CacheKey::for_species("");
        assert_eq!(key.as_str(), CACHE_KEY_BASE);
        assert_ne!(key, CacheKey::for_species(" "));
    }
}
