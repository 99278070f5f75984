//! Forecast Oracle Client
//!
//! Sends an 18-step input window to the inference service and decodes the
//! 36-step forecast it returns. The service has shipped several response
//! layouts over time; all of them are accepted here and normalized into a
//! [`Forecast`], failing loudly on anything with the wrong shape.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::OracleConfig;
use crate::types::{Forecast, Levels, Reading, ShapeError};

/// Oracle client errors. All are recoverable at the cycle level.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Oracle returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Undecodable oracle response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Forecast shape mismatch: {0}")]
    Shape(#[from] ShapeError),
    #[error("Oracle reported an error: {0}")]
    Remote(String),
}

/// Anything that maps an input window to a 36-step forecast.
#[async_trait]
pub trait ForecastOracle: Send + Sync {
    async fn forecast(&self, reading: &Reading) -> Result<Forecast, OracleError>;

    /// Where forecasts come from, for logging
    fn endpoint(&self) -> &str;
}

// ============================================================================
// Response Decoding
// ============================================================================

/// Every body layout the inference service is known to produce.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OracleResponse {
    /// `[[nh3, ch4, co, temp, humidity], ...]`
    Rows(Vec<Vec<f64>>),
    /// `{"predictions": ...}`
    Wrapped { predictions: Predictions },
    /// `{"error": "..."}`
    Remote { error: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Predictions {
    Rows(Vec<Vec<f64>>),
    Detailed(Vec<DetailedStep>),
}

/// One entry of the detailed layout. `timestep` and `alerts` are ignored;
/// hazards are reclassified locally.
#[derive(Debug, Deserialize)]
struct DetailedStep {
    prediction: Levels,
}

/// Decode a response body into a forecast.
pub fn decode_forecast(body: &[u8]) -> Result<Forecast, OracleError> {
    match serde_json::from_slice::<OracleResponse>(body)? {
        OracleResponse::Rows(rows)
        | OracleResponse::Wrapped {
            predictions: Predictions::Rows(rows),
        } => Ok(Forecast::from_rows(&rows)?),
        OracleResponse::Wrapped {
            predictions: Predictions::Detailed(steps),
        } => {
            let levels: Vec<Levels> = steps.into_iter().map(|s| s.prediction).collect();
            Ok(Forecast::from_levels(&levels)?)
        }
        OracleResponse::Remote { error } => Err(OracleError::Remote(error)),
    }
}

// ============================================================================
// HTTP Oracle
// ============================================================================

/// Oracle reached over HTTP: `POST <url>` with the reading as JSON.
#[derive(Clone)]
pub struct HttpOracle {
    http: reqwest::Client,
    url: String,
}

impl HttpOracle {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    pub fn from_config(config: &OracleConfig) -> Result<Self, OracleError> {
        Self::new(&config.url, Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl ForecastOracle for HttpOracle {
    async fn forecast(&self, reading: &Reading) -> Result<Forecast, OracleError> {
        let resp = self.http.post(&self.url).json(reading).send().await?;

        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        debug!(bytes = body.len(), "Oracle response received");
        decode_forecast(&body)
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}
