//! Summary service handlers
//!
//! Every forecasting endpoint takes the same body as the station sends to
//! the oracle: five channels of exactly 18 samples.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use super::envelope;
use crate::hazard::{build_summary, critical_alerts, HazardClassifier};
use crate::oracle::ForecastOracle;
use crate::types::{AlertLabel, Forecast, HazardSummary, Levels, Reading};

/// Decimal places kept in per-step predictions.
pub const PREDICTION_PRECISION: i32 = 3;

const BANNER_MESSAGE: &str =
    "🧑 Human Air Safety API is up and running! Predicts NH3, CH4, CO, Temp, Humidity hazards.";

/// Shared state for the summary service.
#[derive(Clone)]
pub struct ApiState {
    pub oracle: Arc<dyn ForecastOracle>,
    pub classifier: Arc<HazardClassifier>,
}

impl ApiState {
    pub fn new(oracle: Arc<dyn ForecastOracle>, classifier: HazardClassifier) -> Self {
        Self {
            oracle,
            classifier: Arc::new(classifier),
        }
    }

    fn summarize(&self, forecast: &Forecast, reading: &Reading) -> HazardSummary {
        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
        build_summary(&self.classifier, forecast, reading.latest(), timestamp)
    }
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PredictQuery {
    /// Return the condensed summary instead of per-step predictions
    #[serde(default)]
    pub summary: bool,
}

/// One entry of the detailed `/predict` response.
#[derive(Debug, Serialize)]
pub struct StepPrediction {
    pub timestep: usize,
    pub prediction: Levels,
    pub alerts: Vec<AlertLabel>,
}

#[derive(Debug, Serialize)]
pub struct PredictionsResponse {
    pub predictions: Vec<StepPrediction>,
}

#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub status: &'static str,
    pub alerts: Vec<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": BANNER_MESSAGE }))
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /predict?summary=<bool>
pub async fn predict(
    State(state): State<ApiState>,
    Query(query): Query<PredictQuery>,
    body: Result<Json<Reading>, JsonRejection>,
) -> Response {
    let (reading, forecast) = match forecast_for(&state, body).await {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };

    if query.summary {
        return envelope::ok(state.summarize(&forecast, &reading));
    }

    let predictions = forecast
        .steps()
        .iter()
        .enumerate()
        .map(|(i, step)| StepPrediction {
            timestep: i + 1,
            prediction: step.levels().rounded(PREDICTION_PRECISION),
            alerts: state.classifier.classify_step(step),
        })
        .collect();
    envelope::ok(PredictionsResponse { predictions })
}

/// POST /export_reticulum
pub async fn export_reticulum(
    State(state): State<ApiState>,
    body: Result<Json<Reading>, JsonRejection>,
) -> Response {
    let (reading, forecast) = match forecast_for(&state, body).await {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };

    let summary = state.summarize(&forecast, &reading);
    if let Ok(text) = serde_json::to_string(&summary) {
        info!("Reticulum-ready JSON: {text}");
    }
    envelope::ok(summary)
}

/// POST /alert
pub async fn alert(
    State(state): State<ApiState>,
    body: Result<Json<Reading>, JsonRejection>,
) -> Response {
    let (reading, forecast) = match forecast_for(&state, body).await {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };

    let summary = state.summarize(&forecast, &reading);
    let critical = critical_alerts(&summary.alerts);
    let response = if critical.is_empty() {
        AlertResponse {
            status: "✅ All safe",
            alerts: vec!["Air quality within safe thresholds.".to_string()],
        }
    } else {
        AlertResponse {
            status: "🚨 Critical Alerts",
            alerts: critical.iter().map(|a| a.text().to_string()).collect(),
        }
    };
    envelope::ok(response)
}

// ============================================================================
// Helpers
// ============================================================================

/// Validate the body and fetch a forecast, or build the error response.
async fn forecast_for(
    state: &ApiState,
    body: Result<Json<Reading>, JsonRejection>,
) -> Result<(Reading, Forecast), Response> {
    let Json(reading) = body.map_err(|e| envelope::unprocessable(e.body_text()))?;
    reading
        .validate()
        .map_err(|e| envelope::unprocessable(e.to_string()))?;

    match state.oracle.forecast(&reading).await {
        Ok(forecast) => Ok((reading, forecast)),
        Err(e) => {
            warn!(error = %e, "❌ Error during prediction");
            Err(envelope::prediction_failed(e.to_string()))
        }
    }
}
