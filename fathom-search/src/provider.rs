//! Search provider trait

use crate::error::ProviderResult;
use async_trait::async_trait;
use fathom_core::RawSearchResult;

/// A web search backend.
///
/// Implementations own their transport, credentials, and deadlines. A call
/// may legitimately return an empty result list; callers must not treat
/// zero hits as an error. Errors are transport or quota failures only, and
/// callers are expected to degrade rather than abort on them.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name for logging and diagnostics
    fn name(&self) -> &str;

    /// Run one search query and return raw, unsummarized hits.
    async fn search(&self, query: &str) -> ProviderResult<Vec<RawSearchResult>>;
}
