//! Cache headers and header list helpers.

use serde::{Deserialize, Serialize};

/// Header names used by the cache layer.
pub mod header_names {
    /// Cache status header (HIT, MISS).
    pub const X_CACHE: &str = "X-Cache";
    /// Cache directive.
    pub const CACHE_CONTROL: &str = "Cache-Control";
    /// Body media type.
    pub const CONTENT_TYPE: &str = "Content-Type";
    /// Request ID for tracing.
    pub const X_REQUEST_ID: &str = "X-Request-ID";
}

/// Status of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from the edge cache.
    Hit,
    /// Fetched from upstream.
    Miss,
}

impl CacheStatus {
    /// Header value for `X-Cache`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Get a header value by name (case-insensitive).
pub fn get_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Set a header, replacing every existing value with the same name.
pub fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: impl Into<String>) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value.into()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut headers = vec![
            (
                "access-control-allow-origin".to_string(),
                "https://old".to_string(),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];

        set_header(
            &mut headers,
            "Access-Control-Allow-Origin",
            "http://localhost",
        );

        assert_eq!(headers.len(), 2);
        assert_eq!(
            get_header(&headers, "ACCESS-CONTROL-ALLOW-ORIGIN"),
            Some("http://localhost")
        );
    }

    #[test]
    fn test_cache_status_display() {
        assert_eq!(CacheStatus::Hit.to_string(), "HIT");
        assert_eq!(CacheStatus::Miss.to_string(), "MISS");
    }
}
