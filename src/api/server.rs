//! API Server
//!
//! Binds the REST router and serves it until shutdown is requested.

use crate::domain::SharedClassifier;
use crate::error::{Error, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

use super::rest::RestRouter;

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// REST API bind address
    pub addr: SocketAddr,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Max request body size
    pub max_body_size: usize,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            request_timeout_secs: 30,
            max_body_size: 64 * 1024, // 64KB
        }
    }
}

// =============================================================================
// API Server
// =============================================================================

/// HTTP server exposing the loaded classifier
pub struct ApiServer {
    config: ApiServerConfig,
    classifier: SharedClassifier,
    shutdown_tx: broadcast::Sender<()>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: ApiServerConfig, classifier: SharedClassifier) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            classifier,
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.addr).await.map_err(|e| {
            Error::Internal(format!("Failed to bind {}: {}", self.config.addr, e))
        })?;

        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let app = RestRouter::new(self.classifier.clone())
            .request_timeout(Duration::from_secs(self.config.request_timeout_secs))
            .max_body_size(self.config.max_body_size)
            .build();

        let local_addr = listener.local_addr()?;
        info!("REST API listening on {}", local_addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_rx.recv() => {}
                    _ = termination_signal() => {}
                }
                info!("REST server shutting down");
            })
            .await
            .map_err(|e| Error::Internal(format!("REST server error: {}", e)))?;

        Ok(())
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn termination_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
