//! Cross-origin access control.
//!
//! Origins are matched with a prefix rule rather than a full URL parse: an
//! allowed entry matches itself, and any value that continues the entry
//! with `:` (port) or `/` (path).

use edge_core::{CorsConfig, DEFAULT_ALLOWED_ORIGINS};

/// The `Origin` value browsers send for `file://` pages and other opaque
/// origins. Always echoed back.
pub const LOCAL_ACCESS_ORIGIN: &str = "null";

/// Header names used for CORS.
pub mod cors_header_names {
    pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
    pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
    pub const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
}

/// Methods advertised on preflight.
pub const ALLOWED_METHODS: &str = "GET, OPTIONS";

/// Request headers advertised on preflight.
pub const ALLOWED_HEADERS: &str = "Content-Type";

/// Result type for CORS configuration.
pub type CorsResult<T> = Result<T, CorsError>;

/// Errors from building an origin set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorsError {
    #[error("allowed origin list is empty")]
    Empty,
}

/// Ordered, immutable set of allowed origins.
///
/// The first entry is the canonical default returned for requests whose
/// origin is absent or not allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedOrigins {
    origins: Vec<String>,
}

impl AllowedOrigins {
    /// Build an origin set. Fails if `origins` is empty.
    pub fn new<I, S>(origins: I) -> CorsResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let origins: Vec<String> = origins.into_iter().map(Into::into).collect();
        if origins.is_empty() {
            return Err(CorsError::Empty);
        }
        Ok(Self { origins })
    }

    /// Build from workload configuration.
    pub fn from_config(config: &CorsConfig) -> CorsResult<Self> {
        Self::new(config.allowed_origins.iter().cloned())
    }

    /// The fallback origin.
    pub fn default_origin(&self) -> &str {
        &self.origins[0]
    }

    /// Check whether an `Origin` header value is allowed.
    pub fn is_allowed(&self, origin: &str) -> bool {
        if origin == LOCAL_ACCESS_ORIGIN {
            return true;
        }

        self.origins.iter().any(|allowed| {
            origin == allowed
                || origin
                    .strip_prefix(allowed.as_str())
                    .is_some_and(|rest| rest.starts_with(':') || rest.starts_with('/'))
        })
    }

    /// Resolve the value for `Access-Control-Allow-Origin`.
    ///
    /// Allowed origins are echoed verbatim; absent or disallowed origins get
    /// the default.
    pub fn resolve<'a>(&'a self, origin: Option<&'a str>) -> &'a str {
        match origin {
            Some(origin) if self.is_allowed(origin) => origin,
            _ => self.default_origin(),
        }
    }
}

impl Default for AllowedOrigins {
    fn default() -> Self {
        Self {
            origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// CORS response headers for a single request.
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    allow_origin: String,
    preflight: bool,
}

impl CorsHeaders {
    /// Headers for a resolved origin.
    pub fn new(allow_origin: impl Into<String>) -> Self {
        Self {
            allow_origin: allow_origin.into(),
            preflight: false,
        }
    }

    /// Include the preflight method and header lists.
    pub fn preflight(mut self) -> Self {
        self.preflight = true;
        self
    }

    /// Convert to HTTP headers.
    pub fn to_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![(
            cors_header_names::ALLOW_ORIGIN.to_string(),
            self.allow_origin.clone(),
        )];

        if self.preflight {
            headers.push((
                cors_header_names::ALLOW_METHODS.to_string(),
                ALLOWED_METHODS.to_string(),
            ));
            headers.push((
                cors_header_names::ALLOW_HEADERS.to_string(),
                ALLOWED_HEADERS.to_string(),
            ));
        }

        headers
    }
}
