//! Research session request/response types

use fathom_engine::{SessionSnapshot, SessionStatus};
use serde::{Deserialize, Serialize};

/// Request to start research on a topic
#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StartResearchRequest {
    /// Topic to research
    #[cfg_attr(
        feature = "openapi",
        schema(example = "How does the tokio scheduler work?")
    )]
    pub topic: String,
}

/// Response after starting research
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StartResearchResponse {
    /// Session identifier for follow-up requests
    pub session_id: String,
    /// Session status after the topic was accepted
    pub status: SessionStatus,
    /// Human-readable confirmation
    #[cfg_attr(feature = "openapi", schema(example = "Research started"))]
    pub message: String,
}

/// Response after creating an empty session
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateSessionResponse {
    /// Session identifier
    pub session_id: String,
    /// Initial session status
    pub status: SessionStatus,
    /// Prompt describing the input the session is waiting for
    pub prompt: Option<String>,
}

/// List of known sessions
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SessionListResponse {
    /// Session snapshots, oldest first
    pub sessions: Vec<SessionSnapshot>,
    /// Number of sessions
    pub count: usize,
}
