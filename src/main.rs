//! EcoSenseNet station
//!
//! Reads sensor frames from the node, forecasts hazards and sends mesh
//! alerts.
//!
//! # Usage
//!
//! ```bash
//! # Serial node (9600 baud unless --baud or [device].baud_rate says otherwise)
//! ecosense --device /dev/ttyACM0 --destination 1583f76976bcb3747199f86b9ae9e9f6
//!
//! # Serial-over-TCP bridge
//! ecosense --tcp 192.168.1.20:4000
//!
//! # Replay captured output
//! cat capture.log | ecosense --stdin --no-dispatch
//!
//! # Summary service in front of the model server
//! ecosense serve --addr 0.0.0.0:8001 --model-url http://127.0.0.1:8501/predict
//! ```
//!
//! # Environment Variables
//!
//! - `ECOSENSE_CONFIG`: path to a TOML config file
//! - `ECOSENSE_ORACLE_URL`, `ECOSENSE_GATEWAY_URL`, `ECOSENSE_DESTINATION`:
//!   same as the corresponding flags
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ecosense::acquisition::{scanner, DeviceError, DeviceSession, FrameAssembler};
use ecosense::api::{self, ApiState};
use ecosense::config::{AppConfig, DeviceKind};
use ecosense::hazard::HazardClassifier;
use ecosense::messaging::{AlertSink, LogOnlySink, MeshChatGateway};
use ecosense::oracle::HttpOracle;
use ecosense::pipeline::{IngestionLoop, PipelineOrchestrator};
use ecosense::storage::ExportStore;

const BANNER: &str =
    "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "ecosense")]
#[command(about = "EcoSenseNet air-quality hazard station")]
#[command(version)]
struct CliArgs {
    /// Config file (takes precedence over $ECOSENSE_CONFIG and ./ecosense.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Serial device to read frames from
    #[arg(long, value_name = "PATH", conflicts_with_all = ["tcp", "stdin"])]
    device: Option<PathBuf>,

    /// Serial line speed
    #[arg(long, value_name = "RATE", requires = "device")]
    baud: Option<u32>,

    /// Read frames from a serial-to-TCP bridge
    #[arg(long, value_name = "HOST:PORT", conflicts_with = "stdin")]
    tcp: Option<String>,

    /// Read frames from stdin (replay)
    #[arg(long)]
    stdin: bool,

    /// Forecast endpoint
    #[arg(long, env = "ECOSENSE_ORACLE_URL")]
    oracle_url: Option<String>,

    /// MeshChat LXMF send endpoint
    #[arg(long, env = "ECOSENSE_GATEWAY_URL")]
    gateway_url: Option<String>,

    /// LXMF destination hash for alerts
    #[arg(long, env = "ECOSENSE_DESTINATION", value_name = "HASH")]
    destination: Option<String>,

    /// Log alerts instead of sending them
    #[arg(long)]
    no_dispatch: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Run the summary service
    Serve {
        /// Bind address (default from [server].addr)
        #[arg(long, value_name = "HOST:PORT")]
        addr: Option<String>,

        /// Upstream model endpoint (default from [server].model_url)
        #[arg(long)]
        model_url: Option<String>,
    },

    /// List serial ports that look like sensor nodes
    Ports,

    /// Print the effective configuration as TOML
    ShowConfig,
}

// ============================================================================
// Setup
// ============================================================================

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
    }
}

/// Load the config file and apply CLI overrides. Not yet validated.
fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::read_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::load(),
    };

    if let Some(path) = &args.device {
        config.device.kind = DeviceKind::Serial;
        config.device.path.clone_from(path);
        if let Some(baud) = args.baud {
            config.device.baud_rate = baud;
        }
    } else if let Some(addr) = &args.tcp {
        config.device.kind = DeviceKind::Tcp;
        config.device.addr.clone_from(addr);
    } else if args.stdin {
        config.device.kind = DeviceKind::Stdin;
    }
    if let Some(url) = &args.oracle_url {
        config.oracle.url.clone_from(url);
    }
    if let Some(url) = &args.gateway_url {
        config.gateway.url.clone_from(url);
    }
    if let Some(hash) = &args.destination {
        config.gateway.destination_hash.clone_from(hash);
    }
    if args.no_dispatch {
        config.gateway.enabled = false;
    }
    Ok(config)
}

/// Ctrl+C cancels the returned token.
fn shutdown_token() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });
    cancel_token
}

// ============================================================================
// Modes
// ============================================================================

async fn run_station(config: AppConfig) -> Result<()> {
    info!("{BANNER}");
    info!("  EcoSenseNet - Air Quality Hazard Station");
    info!("{BANNER}");
    info!("📥 Input:   {}", config.device.describe());
    info!("🔮 Oracle:  {}", config.oracle.url);
    if config.gateway.enabled {
        info!("📨 Gateway: {} -> {}", config.gateway.url, config.gateway.destination_hash);
    } else {
        info!("📨 Gateway: disabled (alerts are logged only)");
    }
    info!("");

    if config.device.kind == DeviceKind::Serial {
        scanner::log_available_ports();
    }

    let oracle = HttpOracle::from_config(&config.oracle).context("Failed to build oracle client")?;
    let sink: Arc<dyn AlertSink> = if config.gateway.enabled {
        Arc::new(MeshChatGateway::from_config(&config.gateway).context("Failed to build gateway client")?)
    } else {
        Arc::new(LogOnlySink)
    };
    let orchestrator = PipelineOrchestrator::new(
        Arc::new(oracle),
        sink,
        HazardClassifier::new(config.thresholds),
        ExportStore::from_config(&config.storage),
    );

    let cancel_token = shutdown_token();

    let session = DeviceSession::open(&config.device)
        .await
        .with_context(|| format!("Failed to open device ({})", config.device.describe()))?;
    info!("✅ Connected to {}", config.device.describe());

    let mut ingestion = IngestionLoop::new(
        session,
        FrameAssembler::new(config.device.max_frame_bytes),
        orchestrator,
        cancel_token,
    );

    match ingestion.run().await {
        Ok(_) => {}
        // Replayed input simply runs out
        Err(DeviceError::Disconnected) if config.device.kind == DeviceKind::Stdin => {
            info!("Input exhausted");
        }
        Err(e) => return Err(e).context("Ingestion stopped"),
    }

    info!("");
    info!("✓ EcoSenseNet shutdown complete");
    Ok(())
}

async fn run_server(config: &AppConfig, addr: Option<String>, model_url: Option<String>) -> Result<()> {
    let addr = addr.unwrap_or_else(|| config.server.addr.clone());
    let model_url = model_url.unwrap_or_else(|| config.server.model_url.clone());
    info!("🔮 Forecasts from {model_url}");

    let oracle = HttpOracle::new(&model_url, Duration::from_secs(config.oracle.timeout_secs))
        .context("Failed to build model client")?;
    let state = ApiState::new(Arc::new(oracle), HazardClassifier::new(config.thresholds));

    api::serve(&addr, state, shutdown_token()).await
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_format);

    match &args.command {
        Some(SubCommand::Ports) => {
            for port in scanner::list_serial_ports() {
                println!("{}\t{}", port.path.display(), port.description);
            }
            return Ok(());
        }
        Some(SubCommand::ShowConfig) => {
            let config = load_config(&args)?;
            print!("{}", config.to_toml()?);
            if let Err(e) = config.validate() {
                warn!("{e}");
            }
            return Ok(());
        }
        _ => {}
    }

    let mut config = load_config(&args)?;

    if let Some(SubCommand::Serve { addr, model_url }) = args.command {
        // The summary service never dispatches
        config.gateway.enabled = false;
        config.validate().context("Invalid configuration")?;
        return run_server(&config, addr, model_url).await;
    }

    config.validate().context("Invalid configuration")?;
    run_station(config).await
}
