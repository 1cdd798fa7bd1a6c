//! Per-session deduplication ledger

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Records every query and URL a session has touched.
///
/// The ledger only grows. Entries survive approval rejections so a revised
/// research pass never re-searches a query or re-reads a page the session
/// already consumed. Matching is exact string equality; nothing here
/// normalizes case or semantics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupLedger {
    seen_queries: HashSet<String>,
    seen_urls: HashSet<String>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a query for execution. Returns false when the session has
    /// already searched this exact string, in which case the caller must
    /// skip it.
    pub fn claim_query(&mut self, query: &str) -> bool {
        self.seen_queries.insert(query.to_string())
    }

    /// Claim a result URL for processing. Returns false when some earlier
    /// result already claimed it.
    pub fn claim_url(&mut self, url: &str) -> bool {
        self.seen_urls.insert(url.to_string())
    }

    pub fn has_query(&self, query: &str) -> bool {
        self.seen_queries.contains(query)
    }

    pub fn has_url(&self, url: &str) -> bool {
        self.seen_urls.contains(url)
    }

    pub fn query_count(&self) -> usize {
        self.seen_queries.len()
    }

    pub fn url_count(&self) -> usize {
        self.seen_urls.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_claim_wins_second_loses() {
        let mut ledger = DedupLedger::new();

        assert!(ledger.claim_query("rust async"));
        assert!(!ledger.claim_query("rust async"));
        assert!(ledger.claim_query("rust sync"));

        assert!(ledger.claim_url("https://a.example"));
        assert!(!ledger.claim_url("https://a.example"));
    }

    #[test]
    fn matching_is_exact_not_normalized() {
        let mut ledger = DedupLedger::new();

        assert!(ledger.claim_query("Rust Async"));
        assert!(ledger.claim_query("rust async"));
        assert_eq!(ledger.query_count(), 2);
    }

    #[test]
    fn queries_and_urls_are_separate_namespaces() {
        let mut ledger = DedupLedger::new();

        assert!(ledger.claim_query("https://a.example"));
        assert!(ledger.claim_url("https://a.example"));
    }

    #[test]
    fn survives_serialization() {
        let mut ledger = DedupLedger::new();
        ledger.claim_query("q1");
        ledger.claim_url("https://a.example");

        let json = serde_json::to_string(&ledger).unwrap();
        let restored: DedupLedger = serde_json::from_str(&json).unwrap();

        assert!(restored.has_query("q1"));
        assert!(restored.has_url("https://a.example"));
        assert!(!restored.has_query("q2"));
    }
}
