//! End-to-end API tests over an engine backed by mock LLM and search backends

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use fathom_core::{FathomConfig, RawSearchResult};
use fathom_engine::{MemorySessionStore, ResearchEngine, APPROVAL_PROMPT, TOPIC_PROMPT};
use fathom_search::{ProviderResult, SearchProvider};
use fathom_web::{create_app, AppState, WebConfig};
use serde_json::{json, Value};

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
            r#"["tokio scheduler architecture", "tokio work stealing design"]"#
        } else if prompt.contains("isRelevant") {
            r#"{"isRelevant": true, "reason": "directly discusses the scheduler"}"#
        } else if prompt.contains("followUpQuestions") {
            r#"{"learning": "The runtime parks idle workers and wakes them on new work.",
                "followUpQuestions": ["How does work stealing interact with LIFO slots?"]}"#
        } else if prompt.contains("condense web page text") {
            "A dense summary of the page."
        } else if prompt.contains("research analyst") {
            "# Research Report\n\nThe scheduler uses work stealing."
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

/// Returns one short-content result per call, each with a fresh URL.
struct UniqueResultProvider {
    counter: AtomicUsize,
}

impl UniqueResultProvider {
    fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SearchProvider for UniqueResultProvider {
    fn name(&self) -> &str {
        "unique-results"
    }

    async fn search(&self, query: &str) -> ProviderResult<Vec<RawSearchResult>> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(vec![RawSearchResult {
            title: format!("Result for {query}"),
            url: format!("https://example.com/doc-{n}"),
            content: "The runtime parks idle workers to save power.".to_string(),
        }])
    }
}

async fn test_state() -> AppState {
    let engine = ResearchEngine::builder(FathomConfig::default())
        .with_chat_client(Arc::new(MockLlmClient))
        .with_search_provider(Arc::new(UniqueResultProvider::new()))
        .with_store(Arc::new(MemorySessionStore::new()))
        .build()
        .await
        .expect("engine should build with injected collaborators");

    AppState::with_engine(WebConfig::default(), Arc::new(engine))
}

async fn test_server() -> TestServer {
    TestServer::new(create_app(test_state().await)).expect("test server should start")
}

/// Poll the session endpoint until it reports the wanted status.
async fn wait_for_status(server: &TestServer, session_id: &str, status: &str) -> Value {
    for _ in 0..250 {
        let response = server
            .get(&format!("/api/research/sessions/{session_id}"))
            .await;
        let snapshot: Value = response.json();
        if snapshot["status"] == status {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("session {session_id} never reached status {status}");
}

/// Create a session, feed it a topic, and wait for the approval suspend.
async fn run_to_approval(server: &TestServer) -> String {
    let created: Value = server.post("/api/research/sessions").await.json();
    let session_id = created["session_id"].as_str().expect("session id").to_string();

    server
        .post(&format!("/api/research/sessions/{session_id}/resume"))
        .json(&json!({"kind": "topic", "query": "tokio scheduler internals"}))
        .await
        .assert_status_ok();

    wait_for_status(server, &session_id, "awaiting_approval").await;
    session_id
}

#[tokio::test]
async fn health_reports_healthy() {
    let server = test_server().await;

    let response = server.get("/api/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn start_research_runs_to_the_approval_suspend() {
    let server = test_server().await;

    let response = server
        .post("/api/research")
        .json(&json!({"topic": "tokio scheduler internals"}))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "researching");
    assert_eq!(body["message"], "Research started");
    let session_id = body["session_id"].as_str().expect("session id").to_string();

    let snapshot = wait_for_status(&server, &session_id, "awaiting_approval").await;
    assert_eq!(snapshot["topic"], "tokio scheduler internals");
    assert_eq!(snapshot["learnings"].as_array().expect("learnings").len(), 3);
    assert_eq!(snapshot["prompt"], APPROVAL_PROMPT);
    assert!(snapshot["report"].is_null());
}

#[tokio::test]
async fn approval_flow_ends_with_a_report() {
    let server = test_server().await;

    let created = server.post("/api/research/sessions").await;
    created.assert_status_ok();
    let created: Value = created.json();
    assert_eq!(created["status"], "awaiting_topic");
    assert_eq!(created["prompt"], TOPIC_PROMPT);
    let session_id = created["session_id"].as_str().expect("session id").to_string();

    let resumed = server
        .post(&format!("/api/research/sessions/{session_id}/resume"))
        .json(&json!({"kind": "topic", "query": "tokio scheduler internals"}))
        .await;
    resumed.assert_status_ok();
    let resumed: Value = resumed.json();
    assert_eq!(resumed["status"], "researching");

    wait_for_status(&server, &session_id, "awaiting_approval").await;

    let approved = server
        .post(&format!("/api/research/sessions/{session_id}/resume"))
        .json(&json!({"kind": "approval", "approved": true}))
        .await;
    approved.assert_status_ok();
    let approved: Value = approved.json();
    assert_eq!(approved["approved"], true);

    let done = wait_for_status(&server, &session_id, "completed").await;
    assert!(done["report"]
        .as_str()
        .expect("report")
        .contains("Research Report"));
    assert!(done["prompt"].is_null());
}

#[tokio::test]
async fn rejection_without_guidance_parks_at_topic_intake() {
    let server = test_server().await;
    let session_id = run_to_approval(&server).await;

    let rejected = server
        .post(&format!("/api/research/sessions/{session_id}/resume"))
        .json(&json!({"kind": "approval", "approved": false}))
        .await;
    rejected.assert_status_ok();

    let snapshot: Value = rejected.json();
    assert_eq!(snapshot["status"], "awaiting_topic");
    assert_eq!(snapshot["revision"], 1);
    assert!(snapshot["approved"].is_null());
    // Collected learnings survive the rejection
    assert_eq!(snapshot["learnings"].as_array().expect("learnings").len(), 3);
}

#[tokio::test]
async fn mismatched_resume_payload_is_a_conflict() {
    let server = test_server().await;

    let created: Value = server.post("/api/research/sessions").await.json();
    let session_id = created["session_id"].as_str().expect("session id").to_string();

    let response = server
        .post(&format!("/api/research/sessions/{session_id}/resume"))
        .json(&json!({"kind": "approval", "approved": true}))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let snapshot: Value = server
        .get(&format!("/api/research/sessions/{session_id}"))
        .await
        .json();
    assert_eq!(snapshot["status"], "awaiting_topic");
}

#[tokio::test]
async fn unknown_sessions_return_not_found() {
    let server = test_server().await;

    server
        .get("/api/research/sessions/no-such-session")
        .await
        .assert_status_not_found();

    server
        .post("/api/research/sessions/no-such-session/resume")
        .json(&json!({"kind": "topic", "query": "anything"}))
        .await
        .assert_status_not_found();

    server
        .delete("/api/research/sessions/no-such-session")
        .await
        .assert_status_not_found();

    server
        .get("/api/research/sessions/no-such-session/events")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn sessions_can_be_listed_and_deleted() {
    let server = test_server().await;

    let first: Value = server.post("/api/research/sessions").await.json();
    let second: Value = server.post("/api/research/sessions").await.json();
    let first_id = first["session_id"].as_str().expect("session id");
    let second_id = second["session_id"].as_str().expect("session id");

    let list: Value = server.get("/api/research/sessions").await.json();
    assert_eq!(list["count"], 2);
    assert_eq!(list["sessions"][0]["id"], first_id);
    assert_eq!(list["sessions"][1]["id"], second_id);

    let deleted = server
        .delete(&format!("/api/research/sessions/{first_id}"))
        .await;
    deleted.assert_status_ok();
    let deleted: Value = deleted.json();
    assert_eq!(deleted["status"], "deleted");
    assert_eq!(deleted["session_id"], first_id);

    let list: Value = server.get("/api/research/sessions").await.json();
    assert_eq!(list["count"], 1);
    assert_eq!(list["sessions"][0]["id"], second_id);

    server
        .get(&format!("/api/research/sessions/{first_id}"))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn progress_events_stream_over_sse_until_completion() {
    let state = test_state().await;
    let server = TestServer::new(create_app(state.clone())).expect("test server should start");
    let events_server = TestServer::new(create_app(state)).expect("test server should start");

    let created: Value = server.post("/api/research/sessions").await.json();
    let session_id = created["session_id"].as_str().expect("session id").to_string();

    // The SSE response only resolves once the stream closes after the
    // terminal event, so it has to run concurrently with the requests
    // that drive the session forward.
    let events_id = session_id.clone();
    let events_task = tokio::spawn(async move {
        events_server
            .get(&format!("/api/research/sessions/{events_id}/events"))
            .await
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    server
        .post(&format!("/api/research/sessions/{session_id}/resume"))
        .json(&json!({"kind": "topic", "query": "tokio scheduler internals"}))
        .await
        .assert_status_ok();
    wait_for_status(&server, &session_id, "awaiting_approval").await;

    server
        .post(&format!("/api/research/sessions/{session_id}/resume"))
        .json(&json!({"kind": "approval", "approved": true}))
        .await
        .assert_status_ok();
    wait_for_status(&server, &session_id, "completed").await;

    let response = tokio::time::timeout(Duration::from_secs(5), events_task)
        .await
        .expect("SSE stream should close after the terminal event")
        .expect("events request should not panic");
    response.assert_status_ok();

    let body = response.text();
    assert!(body.contains("research_progress"));
    assert!(body.contains(r#""type":"step""#));
    assert!(body.contains("Research completed with 3 learnings"));
}
