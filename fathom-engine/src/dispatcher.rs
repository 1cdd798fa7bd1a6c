//! Search dispatch with session-level deduplication

use crate::ledger::DedupLedger;
use fathom_agents::ContentSummarizer;
use fathom_core::{
    text::truncate_chars, Query, RawSearchResult, ResearchConfig, SearchResult, SearchSettings,
};
use fathom_search::SearchProvider;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// What one dispatched query produced.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub query: Query,
    pub results: Vec<SearchResult>,
    /// Reason the result set is empty, when it is: provider failure or a
    /// legitimately empty search.
    pub error: Option<String>,
    /// True when the ledger had already seen this query and the search was
    /// skipped entirely.
    pub duplicate: bool,
}

impl DispatchOutcome {
    fn empty(query: Query, error: Option<String>, duplicate: bool) -> Self {
        Self {
            query,
            results: Vec::new(),
            error,
            duplicate,
        }
    }
}

/// Runs single queries end to end: claim, search, URL dedup, content
/// bounding. Shares the session's ledger with every other dispatch running
/// concurrently in the same phase.
pub struct SearchDispatcher {
    provider: Arc<dyn SearchProvider>,
    summarizer: ContentSummarizer,
    ledger: Arc<Mutex<DedupLedger>>,
    search: SearchSettings,
    research: ResearchConfig,
}

impl SearchDispatcher {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        summarizer: ContentSummarizer,
        ledger: Arc<Mutex<DedupLedger>>,
        search: SearchSettings,
        research: ResearchConfig,
    ) -> Self {
        Self {
            provider,
            summarizer,
            ledger,
            search,
            research,
        }
    }

    /// Dispatch one query.
    ///
    /// Never fails: duplicates short-circuit, provider errors come back as
    /// an empty outcome with a reason, and the caller proceeds either way.
    pub async fn dispatch(&self, query: Query) -> DispatchOutcome {
        {
            let mut ledger = self.ledger.lock().await;
            if !ledger.claim_query(&query.text) {
                info!(query = %query.text, "Skipping duplicate query");
                return DispatchOutcome::empty(query, None, true);
            }
        }

        let raw_results = match self.provider.search(&query.text).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(query = %query.text, error = %e, "Search failed, continuing with no results");
                return DispatchOutcome::empty(query, Some(e.to_string()), false);
            }
        };

        if raw_results.is_empty() {
            debug!(query = %query.text, "Search returned no results");
            return DispatchOutcome::empty(
                query,
                Some("Search returned no results".to_string()),
                false,
            );
        }

        let mut results = Vec::new();
        for raw in raw_results {
            // URL dedup happens before any summarization or evaluation, so
            // a page shared by two queries is only ever processed once.
            {
                let mut ledger = self.ledger.lock().await;
                if !ledger.claim_url(&raw.url) {
                    debug!(url = %raw.url, "Dropping result with already-seen URL");
                    continue;
                }
            }

            results.push(self.bound_content(&query.text, raw).await);
        }

        DispatchOutcome {
            query,
            results,
            error: None,
            duplicate: false,
        }
    }

    /// Reduce one fresh result to prompt-sized content.
    ///
    /// Short content passes through untouched; everything else is
    /// summarized, with plain truncation as the fallback when the
    /// summarizer is unavailable.
    async fn bound_content(&self, query_text: &str, raw: RawSearchResult) -> SearchResult {
        let content = if raw.content.chars().count() < self.research.min_summarize_chars {
            raw.content.clone()
        } else {
            let input = truncate_chars(&raw.content, self.search.max_content_chars);
            match self.summarizer.summarize(input, query_text).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(url = %raw.url, error = %e, "Summarization failed, truncating raw content");
                    format!(
                        "{}...",
                        truncate_chars(&raw.content, self.research.summary_fallback_chars)
                    )
                }
            }
        };

        SearchResult {
            title: raw.title,
            url: raw.url,
            content,
        }
    }
}
