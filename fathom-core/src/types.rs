//! Core data type definitions
//!
//! The research domain vocabulary shared by the search, agent, and engine
//! crates. Everything here is plain serializable data; behavior lives with
//! the components that own it.

use serde::{Deserialize, Serialize};

/// Which research pass a query or session belongs to.
///
/// Research runs at most two passes: an initial pass over queries planned
/// from the topic, and a follow-up pass over questions raised by the first
/// pass. There is no deeper recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "kebab-case")]
pub enum ResearchPhase {
    Initial,
    FollowUp,
}

impl std::fmt::Display for ResearchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResearchPhase::Initial => write!(f, "initial"),
            ResearchPhase::FollowUp => write!(f, "follow-up"),
        }
    }
}

/// A search query, immutable once issued.
///
/// Queries are unique within a session by exact string match only; nothing
/// deduplicates semantically similar phrasings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Query {
    pub text: String,
    pub origin: ResearchPhase,
}

impl Query {
    pub fn initial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: ResearchPhase::Initial,
        }
    }

    pub fn follow_up(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: ResearchPhase::FollowUp,
        }
    }
}

/// A raw hit straight from the search provider. Content is whatever the
/// provider returned, possibly empty, not yet bounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// A search hit after content summarization. `content` is bounded text
/// suitable for prompt inclusion, never raw page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// Relevance judgment for one search result against its query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EvaluationVerdict {
    pub is_relevant: bool,
    pub reason: String,
}

impl EvaluationVerdict {
    pub fn relevant(reason: impl Into<String>) -> Self {
        Self {
            is_relevant: true,
            reason: reason.into(),
        }
    }

    pub fn not_relevant(reason: impl Into<String>) -> Self {
        Self {
            is_relevant: false,
            reason: reason.into(),
        }
    }
}

/// A distilled insight from one relevant search result.
///
/// Carries at most one follow-up question; the follow-up feeds the second
/// research pass and is discarded when produced by the second pass itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Learning {
    pub text: String,
    pub follow_up_questions: Vec<String>,
    pub source_url: String,
}

impl Learning {
    /// Placeholder learning recorded when extraction fails for a result.
    pub fn placeholder(source_url: impl Into<String>) -> Self {
        Self {
            text: "Error extracting information".to_string(),
            follow_up_questions: Vec::new(),
            source_url: source_url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&ResearchPhase::FollowUp).unwrap(),
            "\"follow-up\""
        );
        assert_eq!(
            serde_json::to_string(&ResearchPhase::Initial).unwrap(),
            "\"initial\""
        );
    }

    #[test]
    fn query_constructors_tag_origin() {
        assert_eq!(Query::initial("a").origin, ResearchPhase::Initial);
        assert_eq!(Query::follow_up("b").origin, ResearchPhase::FollowUp);
    }

    #[test]
    fn placeholder_learning_has_no_follow_ups() {
        let learning = Learning::placeholder("https://example.com");
        assert!(learning.follow_up_questions.is_empty());
        assert_eq!(learning.source_url, "https://example.com");
    }
}
