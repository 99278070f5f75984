//! Summary service routes
//!
//! - `GET  /`                 - banner
//! - `GET  /health`           - liveness
//! - `POST /predict`          - 36 per-step predictions, or the summary with `?summary=true`
//! - `POST /export_reticulum` - hazard summary document
//! - `POST /alert`            - danger-level alerts only

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{self, ApiState};

pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .route("/export_reticulum", post(handlers::export_reticulum))
        .route("/alert", post(handlers::alert))
        .with_state(state)
}
