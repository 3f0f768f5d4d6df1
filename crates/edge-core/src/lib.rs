//! Core abstractions for the edge proxy platform.
//!
//! This crate provides the fundamental types shared by the platform crates
//! and workloads:
//! - `RequestContext` - Method, path, decoded query and headers of a request
//! - `RequestId` - Request identifier for log correlation
//! - `ProxyConfig` - Workload configuration loaded from platform variables
//! - `ConfigError` - Configuration failures

mod config;
mod context;
mod error;

pub use config::*;
pub use context::*;
pub use error::*;
