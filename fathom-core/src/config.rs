//! Configuration management
//!
//! TOML-backed configuration with environment overrides. Loading order:
//! explicit path, then `~/.config/fathom/config.toml`, then built-in
//! defaults. Missing files are not an error.

use crate::error::{ErrorContext, FathomError, FathomResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the whole system
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FathomConfig {
    pub llm: LlmSettings,
    pub search: SearchSettings,
    pub research: ResearchConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Completion-service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Provider name: openai, anthropic, or ollama
    pub provider: String,
    pub model: String,
    /// Falls back to the provider's conventional environment variable
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.3,
            max_tokens: Some(2000),
        }
    }
}

/// Search-provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Falls back to EXA_API_KEY
    pub api_key: Option<String>,
    pub base_url: String,
    /// Results requested per query
    pub num_results: usize,
    /// Cap on characters of page text requested per result
    pub max_content_chars: usize,
    /// Deadline for one search call
    pub timeout_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.exa.ai".to_string(),
            num_results: 2,
            max_content_chars: 8000,
            timeout_ms: 30_000,
        }
    }
}

/// Tunables for the research workflow itself
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Queries planned for the initial pass (2-3)
    pub initial_query_count: usize,
    /// Fan-out width for concurrent search/evaluation/extraction
    pub concurrency: usize,
    /// How many times an approval rejection may loop the session back
    /// before it is declined outright
    pub max_revisions: u32,
    /// Content shorter than this skips summarization entirely
    pub min_summarize_chars: usize,
    /// Truncation length used when summarization fails
    pub summary_fallback_chars: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            initial_query_count: 3,
            concurrency: 4,
            max_revisions: 3,
            min_summarize_chars: 100,
            summary_fallback_chars: 500,
        }
    }
}

/// Where session state lives between suspend points
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one JSON file per session
    pub data_dir: PathBuf,
    /// Disable to keep sessions purely in memory
    pub persist_sessions: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            persist_sessions: true,
        }
    }
}

/// Default session directory: `~/.fathom/sessions`
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fathom")
        .join("sessions")
}

/// Default config file: `~/.config/fathom/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fathom").join("config.toml"))
}

impl FathomConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> FathomResult<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| FathomError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_metadata("path", &path.as_ref().display().to_string())
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: FathomConfig = toml::from_str(&content).map_err(|e| FathomError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from the default location, or fall back to defaults when no
    /// config file exists yet.
    pub fn load_default() -> FathomResult<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> FathomResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| FathomError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content).map_err(|e| FathomError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> FathomResult<()> {
        if self.research.initial_query_count == 0 || self.research.initial_query_count > 3 {
            return Err(FathomError::Config {
                message: "research.initial_query_count must be between 1 and 3".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set research.initial_query_count to 2 or 3"),
            });
        }

        if self.research.concurrency == 0 {
            return Err(FathomError::Config {
                message: "research.concurrency must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set research.concurrency to a positive value"),
            });
        }

        if self.search.num_results == 0 {
            return Err(FathomError::Config {
                message: "search.num_results must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set search.num_results to a positive value"),
            });
        }

        Ok(())
    }

    /// Apply environment-variable overrides for secrets
    pub fn apply_env(mut self) -> Self {
        if self.llm.api_key.is_none() {
            self.llm.api_key = match self.llm.provider.as_str() {
                "openai" => std::env::var("OPENAI_API_KEY").ok(),
                "anthropic" => std::env::var("ANTHROPIC_API_KEY").ok(),
                _ => None,
            };
        }
        if self.search.api_key.is_none() {
            self.search.api_key = std::env::var("EXA_API_KEY").ok();
        }
        self
    }
}
