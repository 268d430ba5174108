//! HTTP server lifecycle.

use std::future::Future;

use tokio::net::TcpListener;

use crate::routes::router;
use crate::state::AppState;

/// Serves the control surface on `listener` until `shutdown` resolves.
///
/// Running campaigns are stopped, and their loops awaited, before this
/// returns.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "Control surface listening");

    let registry = state.registry().clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Shutting down campaigns");
    registry.stop_all().await;
    Ok(())
}
