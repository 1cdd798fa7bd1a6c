//! Tests for the LLM-backed agents with a mock chat client

use std::sync::Arc;

use fathom_agents::{
    ContentSummarizer, InsightExtractor, QueryPlanner, ReportSynthesizer, ResultEvaluator,
};
use fathom_core::{Learning, ResearchPhase, SearchResult};

/// Mock LLM client that answers based on what each agent asks for.
struct MockLlmClient;

#[async_trait::async_trait]
impl siumai::prelude::ChatCapability for MockLlmClient {
    async fn chat_with_tools<'a>(
        &'a self,
        messages: Vec<siumai::prelude::ChatMessage>,
        _tools: Option<Vec<siumai::prelude::Tool>>,
    ) -> Result<siumai::prelude::ChatResponse, siumai::prelude::LlmError> {
        let prompt = messages
            .iter()
            .filter_map(|m| m.content_text())
            .collect::<Vec<_>>()
            .join("\n");

        let mock_response = if prompt.contains("JSON array of strings") {
            // Query planning
            r#"Here you go:
            ["rust async runtime internals", "tokio scheduler design", "rust async runtime internals"]"#
        } else if prompt.contains("isRelevant") {
            // Relevance evaluation
            r#"{"isRelevant": true, "reason": "directly discusses the scheduler"}"#
        } else if prompt.contains("followUpQuestions") {
            // Learning extraction; extra follow-ups must be trimmed by the agent
            r#"{"learning": "Tokio uses a work-stealing scheduler.",
                "followUpQuestions": ["How does work stealing interact with LIFO slots?",
                                      "What is the blocking pool for?",
                                      "How are timers driven?"]}"#
        } else if prompt.contains("condense web page text") {
            "Tokio's scheduler distributes tasks across worker threads and steals \
             work from busy peers to keep cores saturated."
        } else if prompt.contains("research analyst") {
            "# Research Report\n\nTokio schedules asynchronous tasks cooperatively."
        } else {
            "Mock response."
        };

        Ok(siumai::prelude::ChatResponse {
            id: Some("mock-response".to_string()),
            content: siumai::prelude::MessageContent::Text(mock_response.to_string()),
            model: Some("mock-model".to_string()),
            usage: None,
            finish_reason: Some(siumai::prelude::FinishReason::Stop),
            tool_calls: None,
            thinking: None,
            metadata: std::collections::HashMap::new(),
        })
    }

    async fn chat_stream<'a>(
        &'a self,
        _messages: Vec<siumai::prelude::ChatMessage>,
        _tools: Option<Vec<siumai::prelude::Tool>>,
    ) -> Result<siumai::prelude::ChatStream, siumai::prelude::LlmError> {
        Err(siumai::prelude::LlmError::UnsupportedOperation(
            "Streaming not supported in mock".to_string(),
        ))
    }
}

/// Mock client whose every call fails, for exercising degraded paths.
struct FailingLlmClient;

#[async_trait::async_trait]
impl siumai::prelude::ChatCapability for FailingLlmClient {
    async fn chat_with_tools<'a>(
        &'a self,
        _messages: Vec<siumai::prelude::ChatMessage>,
        _tools: Option<Vec<siumai::prelude::Tool>>,
    ) -> Result<siumai::prelude::ChatResponse, siumai::prelude::LlmError> {
        Err(siumai::prelude::LlmError::UnsupportedOperation(
            "Mock provider is down".to_string(),
        ))
    }

    async fn chat_stream<'a>(
        &'a self,
        _messages: Vec<siumai::prelude::ChatMessage>,
        _tools: Option<Vec<siumai::prelude::Tool>>,
    ) -> Result<siumai::prelude::ChatStream, siumai::prelude::LlmError> {
        Err(siumai::prelude::LlmError::UnsupportedOperation(
            "Streaming not supported in mock".to_string(),
        ))
    }
}

fn sample_result() -> SearchResult {
    SearchResult {
        title: "Inside the Tokio scheduler".to_string(),
        url: "https://example.com/tokio-scheduler".to_string(),
        content: "An in-depth look at the multi-threaded runtime.".to_string(),
    }
}

#[tokio::test]
async fn planner_parses_and_deduplicates_queries() {
    let planner = QueryPlanner::new(Arc::new(MockLlmClient), 3);

    let queries = planner.plan_initial_queries("rust async runtimes").await;

    // The mock repeats one query; the planner must deduplicate it.
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].text, "rust async runtime internals");
    assert_eq!(queries[1].text, "tokio scheduler design");
    assert!(queries.iter().all(|q| q.origin == ResearchPhase::Initial));
}

#[tokio::test]
async fn planner_falls_back_to_topic_when_llm_fails() {
    let planner = QueryPlanner::new(Arc::new(FailingLlmClient), 3);

    let queries = planner.plan_initial_queries("rust async runtimes").await;

    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].text, "rust async runtimes");
    assert_eq!(queries[0].origin, ResearchPhase::Initial);
}

#[tokio::test]
async fn evaluator_returns_model_verdict() {
    let evaluator = ResultEvaluator::new(Arc::new(MockLlmClient));

    let verdict = evaluator
        .evaluate("tokio scheduler design", &sample_result())
        .await;

    assert!(verdict.is_relevant);
    assert_eq!(verdict.reason, "directly discusses the scheduler");
}

#[tokio::test]
async fn evaluator_degrades_to_not_relevant_on_failure() {
    let evaluator = ResultEvaluator::new(Arc::new(FailingLlmClient));

    let verdict = evaluator
        .evaluate("tokio scheduler design", &sample_result())
        .await;

    assert!(!verdict.is_relevant);
    assert_eq!(verdict.reason, "Error in evaluation");
}

#[tokio::test]
async fn extractor_keeps_at_most_one_follow_up() {
    let extractor = InsightExtractor::new(Arc::new(MockLlmClient));

    let learning = extractor
        .extract("tokio scheduler design", &sample_result())
        .await;

    assert_eq!(learning.text, "Tokio uses a work-stealing scheduler.");
    assert_eq!(learning.follow_up_questions.len(), 1);
    assert_eq!(
        learning.follow_up_questions[0],
        "How does work stealing interact with LIFO slots?"
    );
    assert_eq!(learning.source_url, "https://example.com/tokio-scheduler");
}

#[tokio::test]
async fn extractor_degrades_to_placeholder_on_failure() {
    let extractor = InsightExtractor::new(Arc::new(FailingLlmClient));

    let learning = extractor
        .extract("tokio scheduler design", &sample_result())
        .await;

    assert_eq!(learning, Learning::placeholder("https://example.com/tokio-scheduler"));
    assert!(learning.follow_up_questions.is_empty());
}

#[tokio::test]
async fn summarizer_returns_summary_text() {
    let summarizer = ContentSummarizer::new(Arc::new(MockLlmClient));

    let summary = summarizer
        .summarize("A very long page body...", "tokio scheduler design")
        .await
        .unwrap();

    assert!(summary.contains("work"));
}

#[tokio::test]
async fn summarizer_surfaces_provider_errors() {
    let summarizer = ContentSummarizer::new(Arc::new(FailingLlmClient));

    let result = summarizer
        .summarize("A very long page body...", "tokio scheduler design")
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn reporter_uses_model_output() {
    let reporter = ReportSynthesizer::new(Arc::new(MockLlmClient));
    let learnings = vec![Learning {
        text: "Tokio uses a work-stealing scheduler.".to_string(),
        follow_up_questions: vec![],
        source_url: "https://example.com/tokio-scheduler".to_string(),
    }];

    let report = reporter
        .synthesize("rust async runtimes", &learnings, &["q1".to_string()])
        .await;

    assert!(report.starts_with("# Research Report"));
}

#[tokio::test]
async fn reporter_falls_back_when_llm_fails() {
    let reporter = ReportSynthesizer::new(Arc::new(FailingLlmClient));
    let learnings = vec![Learning {
        text: "Tokio uses a work-stealing scheduler.".to_string(),
        follow_up_questions: vec![],
        source_url: "https://example.com/tokio-scheduler".to_string(),
    }];

    let report = reporter
        .synthesize("rust async runtimes", &learnings, &["q1".to_string()])
        .await;

    assert!(report.contains("# Research Report: rust async runtimes"));
    assert!(report.contains("Tokio uses a work-stealing scheduler."));
    assert!(report.contains("https://example.com/tokio-scheduler"));
}
