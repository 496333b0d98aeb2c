//! HTTP Server
//!
//! Binds the router and serves it until the shutdown future resolves; axum
//! then stops accepting connections and drains in-flight requests.

use axum::Router;
use drover_core::error::{AppError, Result};
use std::future::Future;
use std::net::SocketAddr;
use tracing::info;

pub async fn serve(
    port: u16,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::Internal(format!("HTTP server failed: {}", e)))?;

    info!("HTTP server stopped");
    Ok(())
}
