mod error;
mod extractors;
pub mod forms;
mod handlers;
mod routes;
pub mod security;
mod state;

pub use extractors::{login_redirect_url, SESSION_COOKIE};
pub use state::AppState;

use crate::services::auth;
use crate::{Config, Database};
use anyhow::Result;
use axum::middleware;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(300);

/// The full application router over `state`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::post_routes(state.max_upload_bytes))
        .merge(routes::auth_routes())
        .merge(routes::media_routes())
        .fallback(handlers::fallback)
        .layer(middleware::from_fn(security::apply_security_headers))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: Config, db: Database, addr: &str) -> Result<()> {
    let state = Arc::new(AppState::new(config, db)?);

    let housekeeping = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HOUSEKEEPING_INTERVAL);
        loop {
            interval.tick().await;
            housekeeping.page_cache.cleanup();
            housekeeping.login_limiter.cleanup();
            match auth::cleanup_expired_sessions(&housekeeping.db) {
                Ok(removed) if removed > 0 => {
                    tracing::info!("Removed {} expired session(s)", removed);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Session cleanup failed: {:?}", e),
            }
        }
    });

    let app = app(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
