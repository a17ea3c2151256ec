use crate::handlers::{self, LivenessState};
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Read-only HTTP server for platform health checks.
pub struct LivenessServer {
    state: Arc<LivenessState>,
}

impl LivenessServer {
    #[must_use]
    pub fn new(state: LivenessState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(handlers::root))
            .route("/health", get(handlers::health))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the server listening on the specified address.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_on(listener).await
    }

    /// Serves on an already bound listener.
    ///
    /// # Errors
    /// Returns an error if serving fails.
    pub async fn serve_on(self, listener: TcpListener) -> anyhow::Result<()> {
        tracing::info!("Liveness endpoint listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
