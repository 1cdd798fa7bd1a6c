//! Search provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Search API key not configured")]
    MissingApiKey,

    #[error("Search timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Core error: {0}")]
    Core(Box<fathom_core::FathomError>),
}

impl From<fathom_core::FathomError> for SearchError {
    fn from(err: fathom_core::FathomError) -> Self {
        SearchError::Core(Box::new(err))
    }
}

pub type ProviderResult<T> = Result<T, SearchError>;
