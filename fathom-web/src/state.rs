//! Application state shared across request handlers

use crate::{WebConfig, WebError, WebResult};
use fathom_core::FathomConfig;
use fathom_engine::ResearchEngine;
use std::sync::Arc;
use tracing::info;

/// Shared application state
///
/// Cheap to clone; every field is either small or behind an [`Arc`].
#[derive(Clone)]
pub struct AppState {
    /// Web server configuration
    pub config: WebConfig,
    /// Research engine driving all sessions
    pub engine: Arc<ResearchEngine>,
}

impl AppState {
    /// Build the application state, loading engine configuration from
    /// the configured file (or the default location) plus environment
    /// overrides.
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let engine_config = match &config.config_path {
            Some(path) => FathomConfig::from_file(path).map_err(|e| {
                WebError::Config(format!("Failed to load configuration from file: {e}"))
            })?,
            None => FathomConfig::load_default()
                .map_err(|e| WebError::Config(format!("Failed to load configuration: {e}")))?,
        }
        .apply_env();

        let engine = ResearchEngine::builder(engine_config).build().await?;

        info!("Application state initialized");

        Ok(Self {
            config,
            engine: Arc::new(engine),
        })
    }

    /// Build state around an existing engine. Used by tests to inject
    /// engines backed by mock providers.
    pub fn with_engine(config: WebConfig, engine: Arc<ResearchEngine>) -> Self {
        Self { config, engine }
    }
}
