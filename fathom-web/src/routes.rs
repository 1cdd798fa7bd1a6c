//! API route definitions

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// All API routes, mounted under `/api` by [`crate::create_app`]
pub fn api_routes() -> Router<AppState> {
    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/research", post(handlers::start_research))
        .route(
            "/research/sessions",
            post(handlers::create_session).get(handlers::list_sessions),
        )
        .route(
            "/research/sessions/{session_id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route(
            "/research/sessions/{session_id}/resume",
            post(handlers::resume_session),
        )
        .route(
            "/research/sessions/{session_id}/events",
            get(handlers::session_events),
        );

    #[cfg(feature = "openapi")]
    let router = router.route("/openapi.json", get(crate::openapi::serve_openapi));

    router
}
