//! OpenAPI documentation for the HTTP API

use crate::handlers;
use crate::handlers::types;
use axum::response::Json;
use utoipa::OpenApi;

/// API documentation root
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fathom API",
        version = "0.1.0",
        description = "Two-phase deep research sessions: plan queries, search and \
                       evaluate sources, extract learnings, then synthesize a report \
                       once the caller approves.",
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        handlers::health::health_check,
        handlers::research::start_research,
        handlers::research::create_session,
        handlers::research::list_sessions,
        handlers::research::get_session,
        handlers::research::delete_session,
        handlers::research::resume_session,
        handlers::research::session_events,
    ),
    components(schemas(
        types::HealthResponse,
        types::StartResearchRequest,
        types::StartResearchResponse,
        types::CreateSessionResponse,
        types::SessionListResponse,
        fathom_engine::SessionSnapshot,
        fathom_engine::SessionStatus,
        fathom_engine::ResumePayload,
        fathom_engine::ProgressEvent,
        fathom_core::ResearchPhase,
        fathom_core::Query,
        fathom_core::SearchResult,
        fathom_core::Learning,
    )),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Research", description = "Research session lifecycle")
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI specification as JSON
pub async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
