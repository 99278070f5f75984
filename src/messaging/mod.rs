//! Mesh Alert Dispatch
//!
//! Formats the per-cycle hazard summary as a short text message and hands it
//! to the MeshChat HTTP API, which relays it over LXMF to the configured
//! destination.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::types::HazardSummary;

/// Dispatch failures. Terminal for the cycle, never for the process.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Gateway unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),
    #[error("Gateway rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Destination for formatted alert text.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn dispatch(&self, message: &str) -> Result<(), DispatchError>;

    /// Sink name for logging
    fn sink_name(&self) -> &str;
}

/// Render the mesh message for one summary.
///
/// `timestamp` is the cycle's file timestamp (`YYYYmmdd_HHMMSS`). Values are
/// printed with a trailing `.0` when integral so the message reads the same
/// as the summary JSON.
pub fn format_alert(timestamp: &str, summary: &HazardSummary) -> String {
    let c = &summary.current;
    format!(
        "[EcoSenseNet Update @ {timestamp}]\n\
         Status: {}\n\
         NH3: {:?} ppm | CH4: {:?} ppm | CO: {:?} ppm\n\
         Temp: {:?}°C | Humidity: {:?}%\n\
         Alerts: {}",
        summary.status,
        c.nh3,
        c.ch4,
        c.co,
        c.temp,
        c.humidity,
        summary.joined_alerts(", "),
    )
}

// ============================================================================
// MeshChat Gateway
// ============================================================================

/// MeshChat `lxmf-messages/send` client.
#[derive(Clone)]
pub struct MeshChatGateway {
    http: reqwest::Client,
    url: String,
    destination_hash: String,
}

impl MeshChatGateway {
    pub fn new(url: &str, destination_hash: &str, timeout: Duration) -> Result<Self, DispatchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.to_string(),
            destination_hash: destination_hash.to_string(),
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, DispatchError> {
        Self::new(
            &config.url,
            &config.destination_hash,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl AlertSink for MeshChatGateway {
    async fn dispatch(&self, message: &str) -> Result<(), DispatchError> {
        let payload = json!({
            "lxmf_message": {
                "destination_hash": self.destination_hash,
                "content": message,
                "fields": {},
            }
        });

        info!("📨 Sending alert to MeshChat...");
        let resp = match self.http.post(&self.url).json(&payload).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(url = %self.url, "MeshChat not reachable, is it running in headless mode?");
                return Err(DispatchError::Unreachable(e));
            }
        };

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let short: String = self.destination_hash.chars().take(16).collect();
        info!(to = %format!("{short}..."), "✅ Alert sent successfully");
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "meshchat"
    }
}

/// Sink used when the gateway is disabled: logs the message and succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlySink;

#[async_trait]
impl AlertSink for LogOnlySink {
    async fn dispatch(&self, message: &str) -> Result<(), DispatchError> {
        info!("Gateway disabled, alert not sent:\n{message}");
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "log-only"
    }
}
