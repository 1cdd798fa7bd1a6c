//! Fathom Agents - LLM call contracts for the research workflow
//!
//! Each agent wraps one narrow completion-service contract: planning initial
//! queries, judging result relevance, extracting learnings, summarizing page
//! content, and synthesizing the final report. Agents that feed the state
//! machine absorb provider failures into placeholder values so the engine
//! never aborts mid-phase; the summarizer surfaces its error instead because
//! its caller owns the truncation fallback.

pub mod client;
pub mod error;
pub mod evaluator;
pub mod extractor;
pub mod planner;
pub mod reporter;
pub mod summarizer;

pub use client::{build_chat_client, complete_text, create_auto_client, SharedChatClient};
pub use error::{AgentError, AgentResult};
pub use evaluator::ResultEvaluator;
pub use extractor::InsightExtractor;
pub use planner::QueryPlanner;
pub use reporter::ReportSynthesizer;
pub use summarizer::ContentSummarizer;
