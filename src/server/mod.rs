//! HTTP surface over the aggregation engine.

mod handlers;
mod routes;

use std::sync::Arc;

use tracing::info;

use crate::scrapers::ScraperManager;

pub use routes::create_router;

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ScraperManager>,
}

/// Run the API server until shutdown.
pub async fn serve(manager: Arc<ScraperManager>, listen_addr: &str) -> anyhow::Result<()> {
    let state = AppState { manager };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
