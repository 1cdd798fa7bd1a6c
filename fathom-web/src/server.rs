//! HTTP server lifecycle

use crate::{create_app, AppState, WebConfig, WebResult};
use std::path::PathBuf;
use tracing::info;

/// Fathom web server
pub struct FathomServer {
    config: WebConfig,
}

impl FathomServer {
    pub fn new(config: WebConfig) -> Self {
        Self { config }
    }

    pub fn builder() -> FathomServerBuilder {
        FathomServerBuilder::default()
    }

    /// Build the application state and serve until the process stops.
    pub async fn start(self) -> WebResult<()> {
        let state = AppState::new(self.config.clone()).await?;
        self.start_with_state(state).await
    }

    /// Serve with a pre-built state. Lets callers inject their own engine.
    pub async fn start_with_state(self, state: AppState) -> WebResult<()> {
        let address = self.config.address();
        let app = create_app(state);

        let listener = tokio::net::TcpListener::bind(&address).await?;
        info!("Fathom server listening on http://{address}");
        if self.config.dev_mode {
            info!("Development mode enabled");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received, stopping server");
}

/// Builder for [`FathomServer`]
#[derive(Default)]
pub struct FathomServerBuilder {
    config: WebConfig,
}

impl FathomServerBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn dev_mode(mut self, enabled: bool) -> Self {
        self.config.dev_mode = enabled;
        self
    }

    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.config_path = Some(path.into());
        self
    }

    pub fn build(self) -> FathomServer {
        FathomServer::new(self.config)
    }
}
