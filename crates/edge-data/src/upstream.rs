//! Xeno-canto recordings client.

use edge_core::UpstreamConfig;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use crate::error::FetchError;
use crate::transport::HttpTransport;

/// Characters left unescaped by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Quality filter appended to every species query.
const QUALITY_FILTER: &str = "q:A";

/// Client for the recordings endpoint.
pub struct XenoCantoClient<T> {
    transport: T,
    base_url: String,
    api_key: String,
    reject_error_status: bool,
}

impl<T: HttpTransport> XenoCantoClient<T> {
    /// Create a client from upstream configuration.
    pub fn new(config: &UpstreamConfig, transport: T) -> Self {
        Self {
            transport,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            reject_error_status: config.reject_error_status,
        }
    }

    /// Build the request URL for a species.
    ///
    /// The query is an exact species match (`sp:"..."`) combined with the
    /// quality filter; `+` is the query-language separator.
    pub fn species_url(&self, species: &str) -> String {
        format!(
            "{}?query=sp:%22{}%22+{}&key={}",
            self.base_url,
            encode_component(species),
            QUALITY_FILTER,
            encode_component(&self.api_key),
        )
    }

    /// Fetch recordings for a species and decode the body as JSON.
    ///
    /// The upstream status is not inspected unless the client was configured
    /// to reject error statuses: a JSON body is success.
    pub async fn fetch_species(&self, species: &str) -> Result<Value, FetchError> {
        let url = self.species_url(species);
        let resp = self.transport.get(&url).await?;

        if !resp.is_success() {
            tracing::warn!(
                species,
                status = resp.status,
                reject = self.reject_error_status,
                "upstream returned non-success status"
            );
            if self.reject_error_status && resp.status >= 400 {
                return Err(FetchError::Http {
                    status: resp.status,
                });
            }
        }

        serde_json::from_slice(&resp.body).map_err(|e| FetchError::Deserialization(e.to_string()))
    }
}

/// Largest integer a JavaScript number holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Serialize a decoded payload the way `JSON.stringify` would.
///
/// Object keys keep the upstream order. Floats without a fractional part
/// inside the exact integer range are written as integers (`1.0` is `1`).
pub fn encode_payload(value: &Value) -> serde_json::Result<Vec<u8>> {
    let mut value = value.clone();
    normalize_numbers(&mut value);
    serde_json::to_vec(&value)
}

fn normalize_numbers(value: &mut Value) {
    match value {
        Value::Number(n) => {
            let integral = n
                .as_f64()
                .filter(|f| n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER);
            if let Some(f) = integral {
                // Integral and inside the safe range, so the cast is exact.
                *value = Value::from(f as i64);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(normalize_numbers),
        Value::Object(map) => map.values_mut().for_each(normalize_numbers),
        _ => {}
    }
}

/// Percent-encode with `encodeURIComponent` semantics.
pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}
