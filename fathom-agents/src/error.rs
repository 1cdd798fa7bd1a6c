//! Agent error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed structured output: {0}")]
    Malformed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(Box<fathom_core::FathomError>),
}

impl From<fathom_core::FathomError> for AgentError {
    fn from(err: fathom_core::FathomError) -> Self {
        AgentError::Core(Box::new(err))
    }
}

pub type AgentResult<T> = Result<T, AgentError>;
