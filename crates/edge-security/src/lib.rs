//! Security infrastructure for the edge proxy platform.
//!
//! This crate provides:
//! - `AllowedOrigins` - Ordered origin allowlist with a fallback default
//! - `CorsHeaders` - CORS response headers for simple and preflight requests
//!
//! # Example
//!
//! ```ignore
//! use edge_security::{AllowedOrigins, CorsHeaders};
//!
//! let origins = AllowedOrigins::new(["https://example.github.io", "http://localhost"])?;
//!
//! // Echoes allowed origins, falls back to the first entry otherwise
//! let origin = origins.resolve(request_origin);
//! let headers = CorsHeaders::new(origin).preflight().to_headers();
//! ```

mod cors;

pub use cors::*;
