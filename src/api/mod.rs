//! Summary service (REST, Axum)
//!
//! `ecosense serve` exposes the forecasting oracle behind the same hazard
//! classification the station uses, so mesh bridges and dashboards can ask
//! for a summary without running the ingestion loop.

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::ApiState;

use anyhow::Context;
use axum::http::{header, Method};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::defaults::SERVER_BODY_LIMIT_BYTES;

/// Environment variable listing allowed CORS origins, comma-separated.
pub const CORS_ORIGINS_ENV_VAR: &str = "ECOSENSE_CORS_ORIGINS";

/// Restrictive by default (same-origin only).
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match std::env::var(CORS_ORIGINS_ENV_VAR) {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

/// Create the application router with middleware.
pub fn create_app(state: ApiState) -> Router {
    routes::api_routes(state)
        .layer(RequestBodyLimitLayer::new(SERVER_BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

/// Bind `addr` and serve until `shutdown` is cancelled.
pub async fn serve(addr: &str, state: ApiState, shutdown: CancellationToken) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind summary service to {addr}"))?;
    info!("🌐 Summary service listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Summary service failed")?;

    info!("Summary service stopped");
    Ok(())
}
