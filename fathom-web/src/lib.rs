//! Web interface for Fathom
//!
//! Exposes research sessions over HTTP: REST endpoints for creating,
//! resuming, and inspecting sessions, plus a Server-Sent Events stream
//! for live progress. The server owns a [`fathom_engine::ResearchEngine`]
//! and keeps no request state of its own.

pub mod handlers;
#[cfg(feature = "openapi")]
pub mod openapi;
mod routes;
mod server;
mod state;

pub use server::{FathomServer, FathomServerBuilder};
pub use state::AppState;

use axum::{extract::DefaultBodyLimit, http::Method, Router};
use std::path::PathBuf;
use thiserror::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Web server configuration
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable development mode (verbose request traces)
    pub dev_mode: bool,
    /// Optional path to an engine configuration file
    pub config_path: Option<PathBuf>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            dev_mode: false,
            config_path: None,
        }
    }
}

impl WebConfig {
    /// Build configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("FATHOM_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("FATHOM_PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }
        if let Ok(dev) = std::env::var("FATHOM_DEV_MODE") {
            config.dev_mode = dev == "1" || dev.eq_ignore_ascii_case("true");
        }
        if let Ok(path) = std::env::var("FATHOM_CONFIG") {
            config.config_path = Some(PathBuf::from(path));
        }

        config
    }

    /// Socket address string for binding
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Web server errors
#[derive(Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] fathom_engine::EngineError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

/// Create the axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(state)
}

/// Initialize logging for the web server
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fathom_web=info,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = WebConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert!(!config.dev_mode);
        assert!(config.config_path.is_none());
    }

    #[test]
    fn address_formatting() {
        let config = WebConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            ..Default::default()
        };
        assert_eq!(config.address(), "0.0.0.0:3000");
    }
}
