//! Fetch error types.

/// Error type for upstream fetches.
///
/// Callers see a single failure outcome; the variant only feeds logs.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}
