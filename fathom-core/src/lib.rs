//! Fathom Core - shared data structures, configuration, and infrastructure
//!
//! This crate defines the domain vocabulary and the cross-cutting concerns
//! (errors, logging, config, async helpers) used by every other Fathom crate.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;
pub mod text;
pub mod types;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use logging::*;
pub use text::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio;
pub use tracing;
