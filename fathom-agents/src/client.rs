//! LLM client construction using siumai
//!
//! Builds a shared chat client for the configured provider and exposes the
//! one-shot completion helper the agents call through.

use crate::error::{AgentError, AgentResult};
use fathom_core::LlmSettings;
use siumai::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Chat client handle shared across the agents of one engine.
pub type SharedChatClient = Arc<dyn ChatCapability + Send + Sync>;

/// Build the appropriate siumai client based on configuration
pub async fn build_chat_client(settings: &LlmSettings) -> AgentResult<SharedChatClient> {
    match settings.provider.as_str() {
        "openai" => {
            let api_key = settings
                .api_key
                .clone()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .ok_or_else(|| AgentError::Config("OpenAI API key not found".to_string()))?;

            let mut builder = LlmBuilder::new()
                .openai()
                .api_key(&api_key)
                .model(&settings.model)
                .temperature(settings.temperature);

            if let Some(max_tokens) = settings.max_tokens {
                builder = builder.max_tokens(max_tokens);
            }

            if let Some(base_url) = &settings.base_url {
                builder = builder.base_url(base_url);
            }

            let client = builder
                .build()
                .await
                .map_err(|e| AgentError::Llm(format!("Failed to build OpenAI client: {}", e)))?;

            info!(model = %settings.model, "Created OpenAI chat client");
            Ok(Arc::new(client))
        }
        "anthropic" => {
            let api_key = settings
                .api_key
                .clone()
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
                .ok_or_else(|| AgentError::Config("Anthropic API key not found".to_string()))?;

            let mut builder = LlmBuilder::new()
                .anthropic()
                .api_key(&api_key)
                .model(&settings.model)
                .temperature(settings.temperature);

            if let Some(max_tokens) = settings.max_tokens {
                builder = builder.max_tokens(max_tokens);
            }

            let client = builder
                .build()
                .await
                .map_err(|e| AgentError::Llm(format!("Failed to build Anthropic client: {}", e)))?;

            info!(model = %settings.model, "Created Anthropic chat client");
            Ok(Arc::new(client))
        }
        "ollama" => {
            let base_url = settings
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string());

            let mut builder = LlmBuilder::new()
                .ollama()
                .model(&settings.model)
                .base_url(&base_url)
                .temperature(settings.temperature);

            if let Some(max_tokens) = settings.max_tokens {
                builder = builder.max_tokens(max_tokens);
            }

            let client = builder
                .build()
                .await
                .map_err(|e| AgentError::Llm(format!("Failed to build Ollama client: {}", e)))?;

            info!(model = %settings.model, "Created Ollama chat client");
            Ok(Arc::new(client))
        }
        provider => Err(AgentError::Config(format!(
            "Unsupported LLM provider: {}",
            provider
        ))),
    }
}

/// Create a client with automatic provider detection from the environment
pub async fn create_auto_client() -> AgentResult<SharedChatClient> {
    let candidates = vec![
        ("openai", "OPENAI_API_KEY", configs::openai_default()),
        ("anthropic", "ANTHROPIC_API_KEY", configs::anthropic_default()),
    ];

    for (provider_name, env_var, settings) in candidates {
        if std::env::var(env_var).is_ok() {
            info!("Auto-detected {} provider", provider_name);
            match build_chat_client(&settings).await {
                Ok(client) => return Ok(client),
                Err(e) => {
                    warn!("Failed to create {} client: {}", provider_name, e);
                    continue;
                }
            }
        }
    }

    // Ollama needs no API key, so it is the last resort
    info!("Trying Ollama as fallback");
    build_chat_client(&configs::ollama_default()).await
}

/// Run one system+user completion and return the text content.
pub async fn complete_text(
    client: &SharedChatClient,
    system_prompt: &str,
    user_message: &str,
) -> AgentResult<String> {
    let start_time = Instant::now();
    let messages = vec![system!(system_prompt), user!(user_message)];

    let response = client
        .chat_with_tools(messages, None)
        .await
        .map_err(|e| AgentError::Llm(format!("LLM generation failed: {}", e)))?;

    match response.content_text() {
        Some(content) if !content.is_empty() => {
            debug!(
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                chars = content.len(),
                "Generated completion"
            );
            Ok(content.to_string())
        }
        _ => Err(AgentError::Llm(
            "No text content in LLM response".to_string(),
        )),
    }
}

/// Test the connection to the LLM provider
pub async fn test_connection(client: &SharedChatClient) -> AgentResult<()> {
    let messages = vec![user!(
        "Hello! Please respond with 'OK' to confirm the connection."
    )];

    match client.chat_with_tools(messages, None).await {
        Ok(response) => {
            let preview: String = response
                .content_text()
                .unwrap_or_default()
                .chars()
                .take(50)
                .collect();
            info!("Connection test successful. Response: {}", preview);
            Ok(())
        }
        Err(e) => {
            warn!("Connection test failed: {}", e);
            Err(AgentError::Llm(e.to_string()))
        }
    }
}

/// Helper functions for creating common LLM configurations
pub mod configs {
    use fathom_core::LlmSettings;
    use siumai::models;

    pub fn openai_default() -> LlmSettings {
        LlmSettings {
            provider: "openai".to_string(),
            model: models::openai::GPT_4O_MINI.to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.3,
            max_tokens: Some(2000),
        }
    }

    pub fn anthropic_default() -> LlmSettings {
        LlmSettings {
            provider: "anthropic".to_string(),
            model: models::anthropic::CLAUDE_HAIKU_3_5.to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.3,
            max_tokens: Some(2000),
        }
    }

    pub fn ollama_default() -> LlmSettings {
        LlmSettings {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            base_url: Some("http://localhost:11434".to_string()),
            temperature: 0.3,
            max_tokens: Some(2000),
        }
    }
}
