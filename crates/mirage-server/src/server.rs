//! Router construction and the listening loop.

use crate::error::ServerError;
use crate::handler::{dispatch, for_caller};
use crate::state::AppState;
use anyhow::{Context, Result, bail};
use axum::{Router, extract::DefaultBodyLimit, response::IntoResponse};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

/// Every path goes through the dispatch handler.
///
/// Panics while handling a request become the 500 error envelope.
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);
    let expose_error_detail = state.expose_error_detail;
    let on_panic = move |payload: Box<dyn Any + Send + 'static>| {
        let err = ServerError::from_panic(payload);
        if let ServerError::Internal { detail, .. } = &err {
            tracing::error!(panic = %detail, "Request handler panicked");
        }
        for_caller(err, expose_error_detail).into_response()
    };

    Router::new()
        .fallback(dispatch)
        .with_state(state)
        .layer(body_limit)
        .layer(CatchPanicLayer::custom(on_panic))
        .layer(TraceLayer::new_for_http())
}

/// Bind `host:port`, moving up one port at a time while the address is in
/// use, up to and including `limit`.
pub async fn bind_first_free(host: &str, port: u16, limit: u16) -> Result<TcpListener> {
    let mut candidate = port;
    loop {
        match TcpListener::bind((host, candidate)).await {
            Ok(listener) => {
                if candidate != port {
                    tracing::info!(requested = port, bound = candidate, "Requested port busy, using next free port");
                }
                return Ok(listener);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse && candidate < limit => {
                tracing::debug!(port = candidate, "Port in use");
                candidate += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                bail!("No free port between {} and {} on {}", port, limit, host);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to bind {}:{}", host, candidate));
            }
        }
    }
}

/// HTTP server for the configured endpoints.
pub struct MirageServer {
    state: Arc<AppState>,
    host: String,
    port: u16,
    port_search_limit: u16,
}

impl MirageServer {
    pub fn new(state: AppState, host: impl Into<String>, port: u16) -> Self {
        Self {
            state: Arc::new(state),
            host: host.into(),
            port,
            port_search_limit: port,
        }
    }

    pub fn with_port_search_limit(mut self, limit: u16) -> Self {
        self.port_search_limit = limit.max(self.port);
        self
    }

    /// Bind and serve until Ctrl+C or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let listener = bind_first_free(&self.host, self.port, self.port_search_limit).await?;
        let addr: SocketAddr = listener.local_addr().context("Listener has no local address")?;

        tracing::info!(
            %addr,
            endpoints = self.state.matcher.len(),
            "Mirage server listening"
        );
        tracing::info!("API documentation at http://{}/docs", addr);

        axum::serve(listener, create_router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server failure")?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
