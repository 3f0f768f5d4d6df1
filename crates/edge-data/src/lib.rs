//! Upstream data access for the edge proxy platform.
//!
//! This crate provides:
//! - `XenoCantoClient` - Species recordings lookup with JSON decoding
//! - `HttpTransport` - Outbound HTTP seam (`SpinTransport` on Spin)
//! - `FetchError` - Upstream failure detail for logging

mod error;
mod transport;
mod upstream;

pub use error::*;
pub use transport::*;
pub use upstream::*;
