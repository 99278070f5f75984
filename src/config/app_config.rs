//! Application configuration - every endpoint, path and limit as TOML values
//!
//! Each struct implements `Default` with the values in [`super::defaults`],
//! so a missing section (or no file at all) keeps the built-in behavior.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::hazard::HazardThresholds;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one sensor station.
///
/// Load with [`AppConfig::load`] which searches:
/// 1. `$ECOSENSE_CONFIG`
/// 2. `./ecosense.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Human-exposure limits used by the classifier
    #[serde(default)]
    pub thresholds: HazardThresholds,

    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration using the standard search order.
    ///
    /// A file that exists but cannot be read or parsed is logged and
    /// skipped, falling through to the next source. Values are not
    /// validated here: CLI overrides are applied first, then the caller
    /// runs [`AppConfig::validate`].
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::read_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", defaults::CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", defaults::CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./ecosense.toml
        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::read_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", defaults::LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::LOCAL_CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", defaults::LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Read and parse a TOML file without validating values.
    pub fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::parse(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Load and validate a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document, warning about unknown keys.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config = Self::parse(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Collect every validation problem into one error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors = super::validation::validate_config(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

// ============================================================================
// Device
// ============================================================================

/// How the sensor node is attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Character device path (USB CDC-ACM, FTDI, on-board UART)
    #[default]
    Serial,
    /// Serial-to-TCP bridge
    Tcp,
    /// Frames piped into the process (replay, testing)
    Stdin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub kind: DeviceKind,

    /// Device node, used when `kind = "serial"`
    #[serde(default = "default_device_path")]
    pub path: PathBuf,

    /// `HOST:PORT`, used when `kind = "tcp"`
    #[serde(default = "default_device_addr")]
    pub addr: String,

    /// Line speed, applied when `kind = "serial"` and the path is a tty
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Seconds without a complete line before the read reports idle
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Largest frame buffered before it is discarded
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

fn default_device_path() -> PathBuf {
    PathBuf::from(defaults::DEVICE_PATH)
}

fn default_device_addr() -> String {
    defaults::DEVICE_TCP_ADDR.to_string()
}

const fn default_baud_rate() -> u32 {
    defaults::DEVICE_BAUD_RATE
}

const fn default_read_timeout() -> u64 {
    defaults::DEVICE_READ_TIMEOUT_SECS
}

const fn default_max_frame_bytes() -> usize {
    crate::acquisition::frame_assembler::DEFAULT_MAX_FRAME_BYTES
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            kind: DeviceKind::default(),
            path: default_device_path(),
            addr: default_device_addr(),
            baud_rate: default_baud_rate(),
            read_timeout_secs: default_read_timeout(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl DeviceConfig {
    /// Short description for startup logging.
    pub fn describe(&self) -> String {
        match self.kind {
            DeviceKind::Serial => format!("serial {} @ {} baud", self.path.display(), self.baud_rate),
            DeviceKind::Tcp => format!("tcp {}", self.addr),
            DeviceKind::Stdin => "stdin".to_string(),
        }
    }
}

// ============================================================================
// Oracle
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Forecast endpoint (POST reading, returns 36×5 forecast)
    #[serde(default = "default_oracle_url")]
    pub url: String,

    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
}

fn default_oracle_url() -> String {
    defaults::ORACLE_URL.to_string()
}

const fn default_oracle_timeout() -> u64 {
    defaults::ORACLE_TIMEOUT_SECS
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            url: default_oracle_url(),
            timeout_secs: default_oracle_timeout(),
        }
    }
}

// ============================================================================
// Messaging Gateway
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Set to false to run the pipeline without sending mesh messages
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// LXMF send endpoint
    #[serde(default = "default_gateway_url")]
    pub url: String,

    /// Recipient LXMF address (32 hex characters)
    #[serde(default)]
    pub destination_hash: String,

    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

const fn default_true() -> bool {
    true
}

fn default_gateway_url() -> String {
    defaults::GATEWAY_URL.to_string()
}

const fn default_gateway_timeout() -> u64 {
    defaults::GATEWAY_TIMEOUT_SECS
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_gateway_url(),
            destination_hash: String::new(),
            timeout_secs: default_gateway_timeout(),
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Cumulative reading exports (CSV)
    #[serde(default = "default_exports_dir")]
    pub exports_dir: PathBuf,

    /// Per-cycle summary documents (JSON)
    #[serde(default = "default_summaries_dir")]
    pub summaries_dir: PathBuf,
}

fn default_exports_dir() -> PathBuf {
    PathBuf::from(defaults::EXPORTS_DIR)
}

fn default_summaries_dir() -> PathBuf {
    PathBuf::from(defaults::SUMMARIES_DIR)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            exports_dir: default_exports_dir(),
            summaries_dir: default_summaries_dir(),
        }
    }
}

// ============================================================================
// Summary Service
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for `ecosense serve`
    #[serde(default = "default_server_addr")]
    pub addr: String,

    /// Upstream model endpoint forecasts are fetched from
    #[serde(default = "default_model_url")]
    pub model_url: String,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

fn default_model_url() -> String {
    defaults::MODEL_URL.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
            model_url: default_model_url(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}
