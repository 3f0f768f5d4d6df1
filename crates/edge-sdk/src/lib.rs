//! Public SDK for the edge proxy platform.
//!
//! This crate re-exports all platform functionality:
//!
//! ```ignore
//! use edge_sdk::prelude::*;
//!
//! let origins = AllowedOrigins::default();
//! let cache = EdgeCache::new(KeyValueStore::open("default")?);
//! let client = XenoCantoClient::new(&config.upstream, SpinTransport);
//!
//! let mut tasks = BackgroundTasks::new();
//! // ... handle the request, scheduling cache writes on `tasks` ...
//! tasks.run_to_completion().await;
//! ```

pub use edge_cache;
pub use edge_core;
pub use edge_data;
pub use edge_executor;
pub use edge_observability;
pub use edge_security;

/// Prelude for convenient imports.
pub mod prelude {
    pub use edge_cache::*;
    pub use edge_core::*;
    pub use edge_data::*;
    pub use edge_executor::*;
    pub use edge_observability::*;
    pub use edge_security::*;
}
