//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery. Every `Default` impl in
//! [`super::app_config`] reads from here.

// ============================================================================
// Config File
// ============================================================================

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "ECOSENSE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "ecosense.toml";

// ============================================================================
// Device
// ============================================================================

/// Typical CDC-ACM device for an Arduino-class sensor node.
pub const DEVICE_PATH: &str = "/dev/ttyACM0";

/// Default serial-over-TCP bridge address.
pub const DEVICE_TCP_ADDR: &str = "127.0.0.1:4000";

/// Serial line speed of the sensor node firmware.
pub const DEVICE_BAUD_RATE: u32 = 9600;

/// Line read timeout (seconds). A timeout is reported as idle, not an error.
pub const DEVICE_READ_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Oracle
// ============================================================================

/// Forecast endpoint of the inference service.
pub const ORACLE_URL: &str = "http://127.0.0.1:8001/predict";

/// Per-request timeout for forecast calls (seconds).
pub const ORACLE_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Messaging Gateway
// ============================================================================

/// MeshChat LXMF send endpoint.
pub const GATEWAY_URL: &str = "http://localhost:8000/api/v1/lxmf-messages/send";

/// Per-request timeout for alert dispatch (seconds).
pub const GATEWAY_TIMEOUT_SECS: u64 = 10;

/// LXMF destination hashes are 16 bytes, hex encoded.
pub const DESTINATION_HASH_LEN: usize = 32;

// ============================================================================
// Storage
// ============================================================================

pub const EXPORTS_DIR: &str = "exports";

pub const SUMMARIES_DIR: &str = "summaries";

/// `chrono` format used in artifact file names and alert headers.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ============================================================================
// Summary Service
// ============================================================================

/// Bind address for `ecosense serve`.
pub const SERVER_ADDR: &str = "0.0.0.0:8001";

/// Upstream model endpoint the summary service forecasts through.
pub const MODEL_URL: &str = "http://127.0.0.1:8501/predict";

/// Request body limit for the summary service (bytes).
pub const SERVER_BODY_LIMIT_BYTES: usize = 64 * 1024;
