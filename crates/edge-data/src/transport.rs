//! Outbound HTTP transport.

use async_trait::async_trait;

use crate::error::FetchError;

/// A buffered upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Check for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends outbound GET requests.
///
/// No timeout or retry is applied here; a hanging call is bounded only by
/// the host's request lifetime.
#[async_trait(?Send)]
pub trait HttpTransport {
    /// Issue a GET and buffer the response.
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

/// Transport using Spin outbound HTTP.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinTransport;

#[cfg(target_arch = "wasm32")]
#[async_trait(?Send)]
impl HttpTransport for SpinTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let req = spin_sdk::http::Request::get(url);
        let resp: spin_sdk::http::Response = spin_sdk::http::send(req)
            .await
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        Ok(HttpResponse {
            status: *resp.status(),
            body: resp.body().to_vec(),
        })
    }
}
