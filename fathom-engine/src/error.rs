//! Engine error types

use fathom_core::FathomError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the research engine.
///
/// Provider failures inside a running session are absorbed into degraded
/// results and never appear here; these variants cover the session
/// lifecycle itself.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// The resume payload does not match what the session is waiting for,
    /// or the session is not suspended at all. The session is unchanged.
    #[error("Cannot resume session {session_id}: {reason}")]
    InvalidResumeState { session_id: String, reason: String },

    #[error("Agent error: {0}")]
    Agent(#[from] fathom_agents::AgentError),

    #[error("Search error: {0}")]
    Search(#[from] fathom_search::SearchError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(Box<FathomError>),
}

impl From<FathomError> for EngineError {
    fn from(err: FathomError) -> Self {
        EngineError::Core(Box::new(err))
    }
}

impl EngineError {
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        EngineError::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    pub fn invalid_resume(session_id: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidResumeState {
            session_id: session_id.into(),
            reason: reason.into(),
        }
    }
}
