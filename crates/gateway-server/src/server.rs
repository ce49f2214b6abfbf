//! HTTP server lifecycle.

use crate::{routes::create_router, state::AppState};
use gateway_config::ServerConfig;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// Server failure
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Listener could not be bound
    #[error("Failed to bind {address}: {source}")]
    Bind {
        /// Address requested
        address: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Server loop failed
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Gateway HTTP server
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Create a server for `state`
    #[must_use]
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Bind and serve until SIGINT/SIGTERM.
    ///
    /// After the signal, in-flight requests get `shutdown_timeout` to finish.
    pub async fn run(self) -> Result<(), ServerError> {
        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;

        info!(address = %address, "Gateway listening");
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: std::future::Future<Output = &'static str> + Send + 'static,
    {
        let draining = Arc::new(Notify::new());
        let notify = Arc::clone(&draining);

        let app = create_router(self.state);
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let reason = shutdown.await;
                info!(signal = reason, "Shutdown signal received, draining connections");
                notify.notify_one();
            })
            .into_future();
        tokio::pin!(server);

        let grace = self.config.shutdown_timeout;
        tokio::select! {
            result = &mut server => result?,
            () = async {
                draining.notified().await;
                tokio::time::sleep(grace).await;
            } => {
                warn!(timeout = ?grace, "Shutdown timeout elapsed, dropping open connections");
            }
        }

        info!("Gateway stopped");
        Ok(())
    }
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM
pub async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        "SIGINT"
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
        "SIGTERM"
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        reason = ctrl_c => reason,
        reason = terminate => reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_config::GatewayConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let state = AppState::builder().config(GatewayConfig::default()).build();
        let server = Server::new(ServerConfig::default(), state);

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(listener, async move {
            let _ = rx.await;
            "test"
        }));

        tx.send(()).expect("server waiting");
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server stops")
            .expect("task completes");
        assert!(result.is_ok());
    }
}
