//! Observability infrastructure for the edge proxy platform.
//!
//! This crate provides:
//! - `init_logging` - Global `tracing` subscriber writing to stderr
//! - `StructuredLogger` - Structured logging with request context
//! - `MetricsCollector` - Per-request cache and upstream metrics

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;

// Re-export RequestId from edge-core for convenience
pub use edge_core::RequestId;
