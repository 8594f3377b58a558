//! HTTP surface for HopeLine
//!
//! Serves `POST /chat` for an external chat client and `GET /health`.

mod config;
mod error;
mod routes;
mod state;


use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::HealthResponse;
pub use state::AppState;

use hopeline_core::{Error, Result};

/// Chat HTTP server
pub struct ChatServer {
    config: ServerConfig,
    state: AppState,
}

impl ChatServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn address(&self) -> String {
        self.config.address()
    }

    /// Router with every route and the request trace layer
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Bind and serve until the process is stopped
    pub async fn start(self) -> Result<()> {
        let address = self.config.address();
        let router = self.router();

        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|e| Error::Configuration(format!("Failed to bind {}: {}", address, e)))?;

        tracing::info!("HopeLine chat service listening on http://{}", address);

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Other(format!("Server error: {}", e)))?;

        Ok(())
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(routes::chat))
        .route("/health", get(routes::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
