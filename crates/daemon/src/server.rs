//! HTTP server lifecycle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use crate::api;
use crate::config::Config;
use crate::state::AppState;

/// Interval between sweeps of expired sessions.
pub const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// A configured, not yet listening server.
pub struct Server {
    listen_addr: String,
    state: Arc<AppState>,
}

impl Server {
    pub fn new(config: &Config) -> Result<Self> {
        let state = AppState::from_config(config)?;
        Ok(Self {
            listen_addr: config.server.listen_addr(),
            state: Arc::new(state),
        })
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.listen_addr))?;
        let local_addr = listener.local_addr()?;

        let cleanup = self
            .state
            .sessions
            .start_cleanup_task(SESSION_CLEANUP_INTERVAL);

        tracing::info!(
            address = %local_addr,
            root = %self.state.root().display(),
            "FileGate listening"
        );

        let result = axum::serve(listener, api::router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server error");

        cleanup.abort();
        tracing::info!("Server stopped");
        result
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "Failed to register signal handlers, falling back to Ctrl-C");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                }
                return;
            }
        };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }
}
