//! EcoSenseNet: air-quality hazard forecasting and mesh alerting
//!
//! A sensor node streams multi-line JSON frames of gas, temperature and
//! humidity history over a serial line. Each frame is reassembled, logged,
//! sent to a forecasting oracle, classified against human-exposure limits,
//! condensed into an hourly outlook and broadcast over a Reticulum/LXMF mesh.
//!
//! ## Architecture
//!
//! - **Acquisition**: device session and brace-counting frame reassembly
//! - **Oracle**: HTTP client for the 18-in/36-out forecasting service
//! - **Hazard**: threshold classification and hourly aggregation
//! - **Pipeline**: per-frame orchestration and the ingestion loop
//! - **Messaging**: MeshChat gateway client and alert formatting
//! - **API**: optional summary service (`ecosense serve`)

pub mod acquisition;
pub mod api;
pub mod config;
pub mod hazard;
pub mod messaging;
pub mod oracle;
pub mod pipeline;
pub mod storage;
pub mod types;

pub use config::AppConfig;

pub use types::{
    AlertLabel, Dimension, Forecast, ForecastStep, HazardStatus, HazardSummary, HourlyBucket,
    Levels, Reading, Severity,
};

pub use acquisition::{DeviceError, DeviceSession, FrameAssembler, RawFrame};
pub use hazard::{HazardClassifier, HazardThresholds};
pub use messaging::{AlertSink, MeshChatGateway};
pub use oracle::{ForecastOracle, HttpOracle, OracleError};
pub use pipeline::{IngestionLoop, PipelineOrchestrator, PipelineStats};
pub use storage::ExportStore;
