//! Research session handlers

use super::types::{
    CreateSessionResponse, SessionListResponse, StartResearchRequest, StartResearchResponse,
};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use fathom_engine::{EngineError, ResumePayload, SessionSnapshot};
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Map engine failures onto HTTP status codes.
///
/// Unknown sessions are the client's mistake, mismatched resume payloads
/// are a state conflict, everything else is on us.
fn engine_error_status(operation: &str, err: &EngineError) -> StatusCode {
    match err {
        EngineError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
        EngineError::InvalidResumeState { .. } => StatusCode::CONFLICT,
        _ => {
            error!("Failed to {operation}: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Start research on a topic
///
/// Convenience endpoint that creates a session and immediately feeds it
/// the topic. Research runs in the background; subscribe to the events
/// endpoint or poll the session to follow it.
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        post,
        path = "/api/research",
        tag = "Research",
        request_body = StartResearchRequest,
        responses(
            (status = 200, description = "Research started", body = StartResearchResponse),
            (status = 500, description = "Engine failure")
        )
    )
)]
pub async fn start_research(
    State(state): State<AppState>,
    Json(request): Json<StartResearchRequest>,
) -> Result<Json<StartResearchResponse>, StatusCode> {
    info!("Starting research: {}", request.topic);

    match state.engine.start_research(&request.topic).await {
        Ok(session) => Ok(Json(StartResearchResponse {
            session_id: session.id,
            status: session.status,
            message: "Research started".to_string(),
        })),
        Err(e) => Err(engine_error_status("start research", &e)),
    }
}

/// Create an empty research session
///
/// The session parks at topic intake; resume it with a topic payload to
/// begin researching.
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        post,
        path = "/api/research/sessions",
        tag = "Research",
        responses(
            (status = 200, description = "Session created", body = CreateSessionResponse),
            (status = 500, description = "Engine failure")
        )
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<CreateSessionResponse>, StatusCode> {
    match state.engine.create_session().await {
        Ok(session) => Ok(Json(CreateSessionResponse {
            session_id: session.id,
            status: session.status,
            prompt: session.prompt,
        })),
        Err(e) => Err(engine_error_status("create session", &e)),
    }
}

/// List all research sessions
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/api/research/sessions",
        tag = "Research",
        responses(
            (status = 200, description = "All sessions", body = SessionListResponse)
        )
    )
)]
pub async fn list_sessions(State(state): State<AppState>) -> Json<SessionListResponse> {
    let sessions = state.engine.list_sessions().await;
    let count = sessions.len();
    Json(SessionListResponse { sessions, count })
}

/// Fetch a single session
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/api/research/sessions/{session_id}",
        tag = "Research",
        params(
            ("session_id" = String, Path, description = "Session identifier")
        ),
        responses(
            (status = 200, description = "Session snapshot", body = SessionSnapshot),
            (status = 404, description = "Unknown session")
        )
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSnapshot>, StatusCode> {
    match state.engine.get_session(&session_id).await {
        Ok(session) => Ok(Json(session)),
        Err(e) => Err(engine_error_status("get session", &e)),
    }
}

/// Delete a session
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        delete,
        path = "/api/research/sessions/{session_id}",
        tag = "Research",
        params(
            ("session_id" = String, Path, description = "Session identifier")
        ),
        responses(
            (status = 200, description = "Session deleted"),
            (status = 404, description = "Unknown session")
        )
    )
)]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    match state.engine.delete_session(&session_id).await {
        Ok(()) => {
            info!("Deleted session: {session_id}");
            Ok(Json(serde_json::json!({
                "status": "deleted",
                "session_id": session_id,
            })))
        }
        Err(e) => Err(engine_error_status("delete session", &e)),
    }
}

/// Resume a suspended session
///
/// The payload kind must match what the session is waiting for: a
/// `topic` payload at topic intake, an `approval` payload at report
/// approval. Anything else is rejected with a conflict and the session
/// is left untouched.
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        post,
        path = "/api/research/sessions/{session_id}/resume",
        tag = "Research",
        params(
            ("session_id" = String, Path, description = "Session identifier")
        ),
        request_body = ResumePayload,
        responses(
            (status = 200, description = "Session resumed", body = SessionSnapshot),
            (status = 404, description = "Unknown session"),
            (status = 409, description = "Payload does not match the session state")
        )
    )
)]
pub async fn resume_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<ResumePayload>,
) -> Result<Json<SessionSnapshot>, StatusCode> {
    info!("Resuming session: {session_id}");

    match state.engine.resume(&session_id, payload).await {
        Ok(session) => Ok(Json(session)),
        Err(e) => Err(engine_error_status("resume session", &e)),
    }
}

/// Stream session progress as Server-Sent Events
///
/// Emits one `research_progress` event per engine progress event. The
/// stream stays open across suspensions and closes after a terminal
/// completion or error event.
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/api/research/sessions/{session_id}/events",
        tag = "Research",
        params(
            ("session_id" = String, Path, description = "Session identifier")
        ),
        responses(
            (status = 200, description = "SSE stream of progress events", content_type = "text/event-stream"),
            (status = 404, description = "Unknown session")
        )
    )
)]
pub async fn session_events(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let receiver = state
        .engine
        .subscribe(&session_id)
        .await
        .map_err(|e| engine_error_status("subscribe to session", &e))?;

    info!("SSE subscriber attached to session: {session_id}");

    let stream = stream::unfold(Some(receiver), |slot| async move {
        let mut receiver = slot?;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let terminal = event.is_terminal();
                    let data = serde_json::to_string(&event).unwrap_or_default();
                    let sse = Event::default().event("research_progress").data(data);
                    let next = if terminal { None } else { Some(receiver) };
                    return Some((Ok(sse), next));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("SSE subscriber lagged, dropped {skipped} events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
