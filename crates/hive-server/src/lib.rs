//! HiVE Server Library
//!
//! - HTTP/JSON API over the assignment provisioning orchestrator
//! - Error-to-status mapping for API responses
//! - Readiness watcher that follows a course's environments

pub mod error;
pub mod routes;
pub mod watch;

use std::future::Future;

use tracing::info;

pub use routes::{AppState, AssignmentService, build_router};

/// Serve the API on a pre-bound listener until `shutdown` resolves.
pub async fn serve_on(
    state: AppState,
    listener: tokio::net::TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "API server listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
