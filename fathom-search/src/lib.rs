//! Fathom Search - web search provider abstraction
//!
//! Defines the [`SearchProvider`] seam the research engine dispatches
//! queries through, plus the Exa backend used in production. Providers
//! return raw hits; summarization and dedup happen upstream in the engine.

pub mod error;
pub mod exa;
pub mod provider;

pub use error::{ProviderResult, SearchError};
pub use exa::ExaProvider;
pub use provider::SearchProvider;
