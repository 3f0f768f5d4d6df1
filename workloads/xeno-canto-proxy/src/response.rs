//! Proxy responses.

use edge_sdk::edge_cache::{header_names, set_header, CacheStatus, CachedResponse};
use edge_sdk::edge_security::{cors_header_names, CorsHeaders};
use http::StatusCode;

/// Media type of every body the proxy produces.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Error body for a request without `species`.
pub const MISSING_SPECIES: &str = "Missing species parameter";

/// Error body for any upstream failure.
pub const UPSTREAM_FAILED: &str = "Failed to fetch from xeno-canto";

/// Error body when the workload could not be configured.
pub const MISCONFIGURED: &str = "Proxy misconfigured";

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    /// Status code.
    pub status: StatusCode,
    /// Headers, in insertion order.
    pub headers: Vec<(String, String)>,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl ProxyResponse {
    /// Create an empty response.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Create a JSON response.
    pub fn json(status: StatusCode, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![(
                header_names::CONTENT_TYPE.to_string(),
                JSON_CONTENT_TYPE.to_string(),
            )],
            body,
        }
    }

    /// `{"error": message}` with the CORS origin set.
    pub fn json_error(status: StatusCode, message: &str, allow_origin: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string().into_bytes();
        Self::json(status, body).with_cors(CorsHeaders::new(allow_origin))
    }

    /// Preflight answer: empty body and the full CORS header set.
    pub fn preflight(allow_origin: &str) -> Self {
        Self::new(StatusCode::OK).with_cors(CorsHeaders::new(allow_origin).preflight())
    }

    /// Serve a cached entry to the current requester.
    ///
    /// Stored headers are kept. The CORS origin and cache directive are
    /// replaced with this request's values and the entry is marked as a hit.
    pub fn from_cache(
        entry: CachedResponse,
        allow_origin: &str,
        browser_cache_control: &str,
    ) -> Self {
        let mut headers = entry.headers;
        set_header(&mut headers, cors_header_names::ALLOW_ORIGIN, allow_origin);
        set_header(
            &mut headers,
            header_names::CACHE_CONTROL,
            browser_cache_control,
        );
        set_header(
            &mut headers,
            header_names::X_CACHE,
            CacheStatus::Hit.as_str(),
        );

        Self {
            status: StatusCode::OK,
            headers,
            body: entry.body,
        }
    }

    /// Add CORS headers.
    pub fn with_cors(mut self, cors: CorsHeaders) -> Self {
        for (name, value) in cors.to_headers() {
            set_header(&mut self.headers, &name, value);
        }
        self
    }

    /// Set a header, replacing any existing value.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name, value);
        self
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        edge_sdk::edge_cache::get_header(&self.headers, name)
    }

    #[cfg(test)]
    pub(crate) fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
