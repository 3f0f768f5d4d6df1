//! Deferred task execution.
//!
//! This crate provides:
//! - `BackgroundTasks` - Work scheduled during a request and run after the
//!   response has been sent

mod background;

pub use background::*;
