//! HTTP surface.
//!
//! # Responsibility
//! - Expose direct mail sending (`POST /send-email`).
//! - Expose service status and pause/resume controls.

pub mod routes;

pub use routes::{router, AppState};

use log::info;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

/// Binds `addr` and serves the API until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "event=http_listen module=http status=ok addr={}",
        listener.local_addr()?
    );
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
