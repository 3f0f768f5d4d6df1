//! Workload configuration.
//!
//! Values come from platform variables (Spin application variables in
//! production). Loading goes through a lookup closure so the same code runs
//! against a fixed map in tests.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Variable names read by [`ProxyConfig::from_lookup`].
pub mod variable_names {
    pub const API_KEY: &str = "xeno_canto_api_key";
    pub const UPSTREAM_URL: &str = "upstream_url";
    pub const REJECT_ERROR_STATUS: &str = "reject_error_status";
    pub const ALLOWED_ORIGINS: &str = "allowed_origins";
    pub const BROWSER_MAX_AGE_SECS: &str = "browser_max_age_secs";
    pub const EDGE_MAX_AGE_SECS: &str = "edge_max_age_secs";
    pub const CACHE_STORE: &str = "cache_store";
    pub const LOG_FORMAT: &str = "log_format";
    pub const LOG_LEVEL: &str = "log_level";
}

/// Default upstream endpoint.
pub const DEFAULT_UPSTREAM_URL: &str = "https://xeno-canto.org/api/3/recordings";

/// Origins accepted out of the box. The first entry is the fallback.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://bryancraven.github.io",
    "http://localhost",
    "http://127.0.0.1",
    "null",
];

/// Complete workload configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Upstream API settings.
    pub upstream: UpstreamConfig,
    /// Cross-origin settings.
    #[serde(default)]
    pub cors: CorsConfig,
    /// Cache lifetimes and store selection.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Upstream API settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// API credential appended to every upstream request.
    pub api_key: String,
    /// Recordings endpoint.
    #[serde(default = "default_upstream_url")]
    pub base_url: String,
    /// Treat upstream status >= 400 as a failure even when the body is JSON.
    #[serde(default)]
    pub reject_error_status: bool,
}

// The API key must never reach a log line.
impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("reject_error_status", &self.reject_error_status)
            .finish()
    }
}

impl UpstreamConfig {
    /// Create upstream settings with the default endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_upstream_url(),
            reject_error_status: false,
        }
    }
}

fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}

/// Cross-origin settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Ordered allowed origins; the first entry is the fallback.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect()
}

/// Cache lifetimes and store selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// `max-age` sent to browsers.
    #[serde(default = "default_browser_max_age")]
    pub browser_max_age_secs: u64,
    /// Freshness window of edge cache entries.
    #[serde(default = "default_edge_max_age")]
    pub edge_max_age_secs: u64,
    /// Key-value store label.
    #[serde(default = "default_store")]
    pub store: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            browser_max_age_secs: default_browser_max_age(),
            edge_max_age_secs: default_edge_max_age(),
            store: default_store(),
        }
    }
}

fn default_browser_max_age() -> u64 {
    24 * 60 * 60
}

fn default_edge_max_age() -> u64 {
    7 * 24 * 60 * 60
}

fn default_store() -> String {
    "default".to_string()
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Output format: `json` or `human`.
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Minimum level: `trace`, `debug`, `info`, `warn` or `error`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ProxyConfig {
    /// Create a configuration with defaults for everything but the API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            upstream: UpstreamConfig::new(api_key),
            cors: CorsConfig::default(),
            cache: CacheConfig::default(),
            log: LogConfig::default(),
        }
    }

    /// Load configuration through a variable lookup.
    ///
    /// Unset and empty variables fall back to defaults. The API key is
    /// required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        use variable_names::*;

        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get(API_KEY).ok_or_else(|| ConfigError::Missing(API_KEY.to_string()))?;
        let mut config = Self::new(api_key);

        if let Some(url) = get(UPSTREAM_URL) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::invalid(UPSTREAM_URL, "expected an http(s) URL"));
            }
            config.upstream.base_url = url;
        }

        if let Some(flag) = get(REJECT_ERROR_STATUS) {
            config.upstream.reject_error_status = parse_bool(REJECT_ERROR_STATUS, &flag)?;
        }

        if let Some(origins) = get(ALLOWED_ORIGINS) {
            let origins: Vec<String> = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
            if origins.is_empty() {
                return Err(ConfigError::invalid(ALLOWED_ORIGINS, "no origins listed"));
            }
            config.cors.allowed_origins = origins;
        }

        if let Some(secs) = get(BROWSER_MAX_AGE_SECS) {
            config.cache.browser_max_age_secs = parse_secs(BROWSER_MAX_AGE_SECS, &secs)?;
        }

        if let Some(secs) = get(EDGE_MAX_AGE_SECS) {
            config.cache.edge_max_age_secs = parse_secs(EDGE_MAX_AGE_SECS, &secs)?;
        }

        if let Some(store) = get(CACHE_STORE) {
            config.cache.store = store;
        }

        if let Some(format) = get(LOG_FORMAT) {
            match format.as_str() {
                "json" | "human" => config.log.format = format,
                other => {
                    return Err(ConfigError::invalid(
                        LOG_FORMAT,
                        format!("unknown format '{}'", other),
                    ))
                }
            }
        }

        if let Some(level) = get(LOG_LEVEL) {
            let level = level.to_ascii_lowercase();
            match level.as_str() {
                "trace" | "debug" | "info" | "warn" | "warning" | "error" => {
                    config.log.level = level
                }
                other => {
                    return Err(ConfigError::invalid(
                        LOG_LEVEL,
                        format!("unknown level '{}'", other),
                    ))
                }
            }
        }

        Ok(config)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::invalid(
            name,
            format!("expected a boolean, got '{}'", value),
        )),
    }
}

fn parse_secs(name: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .map_err(|e| ConfigError::invalid(name, e.to_string()))
}
