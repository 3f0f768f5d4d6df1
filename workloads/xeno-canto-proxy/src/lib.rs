//! Edge proxy for the xeno-canto recordings API.
//!
//! A browser asks for recordings of one species; the proxy answers from the
//! shared edge cache when it can, otherwise fetches from xeno-canto with the
//! server-held API key, returns the result and repopulates the cache once the
//! response is out. Every response carries CORS headers for the calling page.

#[cfg(target_arch = "wasm32")]
mod component;
mod dispatcher;
mod response;

pub use dispatcher::*;
pub use response::*;
