//! Per-frame pipeline: decode, persist, forecast, summarize, dispatch.
//!
//! One [`PipelineOrchestrator::run_cycle`] call handles one reassembled
//! frame to completion. Every failure inside a cycle is recoverable: it is
//! logged with its stage and reported in the [`CycleReport`], and the next
//! frame starts from a clean slate. The reading log and statistics are the
//! only state carried between cycles.

use chrono::Local;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::acquisition::{FrameError, RawFrame};
use crate::config::defaults::FILE_TIMESTAMP_FORMAT;
use crate::hazard::{build_summary, HazardClassifier};
use crate::messaging::{format_alert, AlertSink, DispatchError};
use crate::oracle::{ForecastOracle, OracleError};
use crate::storage::{ExportStore, PersistenceError};
use crate::types::{Dimension, HazardSummary, Reading};

/// ISO-8601 local time without offset, as stamped into summaries.
const SUMMARY_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

// ============================================================================
// Stages & Errors
// ============================================================================

/// Cycle stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Parsing,
    Validated,
    Persisted,
    Forecasted,
    Summarized,
    Dispatched,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Parsing => "parsing",
            Self::Validated => "validated",
            Self::Persisted => "persisted",
            Self::Forecasted => "forecasted",
            Self::Summarized => "summarized",
            Self::Dispatched => "dispatched",
        };
        f.write_str(name)
    }
}

/// A reassembled frame that is not a usable reading.
#[derive(Debug, thiserror::Error)]
pub enum FrameDecodeError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("'{key}' is not an array of numbers")]
    InvalidSeries { key: &'static str },
}

/// Every recoverable failure a cycle can end with.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Decode(#[from] FrameDecodeError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Debug)]
pub enum CycleOutcome {
    Completed,
    Aborted { stage: Stage, error: CycleError },
}

impl CycleOutcome {
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub const fn aborted_at(&self) -> Option<Stage> {
        match self {
            Self::Completed => None,
            Self::Aborted { stage, .. } => Some(*stage),
        }
    }
}

/// What one cycle did.
#[derive(Debug)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Built when the cycle reached the summarized stage.
    pub summary: Option<HazardSummary>,
    /// Mesh message text, built alongside the summary.
    pub alert: Option<String>,
    /// Artifact files written during the cycle.
    pub artifacts: Vec<PathBuf>,
    /// Non-blocking persistence failures.
    pub persistence_failures: Vec<PersistenceError>,
}

impl CycleReport {
    const fn new() -> Self {
        Self {
            outcome: CycleOutcome::Completed,
            summary: None,
            alert: None,
            artifacts: Vec::new(),
            persistence_failures: Vec::new(),
        }
    }
}

/// Counters for the final statistics block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Complete frames handed to the orchestrator
    pub frames_received: u64,
    /// Frames the assembler discarded (unbalanced, oversized)
    pub frame_errors: u64,
    /// Readings appended to the cumulative log
    pub readings_logged: u64,
    pub cycles_completed: u64,
    pub aborts: BTreeMap<Stage, u64>,
    pub persistence_failures: u64,
    pub alerts_dispatched: u64,
}

impl PipelineStats {
    pub fn aborts_at(&self, stage: Stage) -> u64 {
        self.aborts.get(&stage).copied().unwrap_or(0)
    }

    pub fn cycles_aborted(&self) -> u64 {
        self.aborts.values().sum()
    }
}

impl std::fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pipeline: {} frames, {} completed, {} aborted, {} alerts sent",
            self.frames_received,
            self.cycles_completed,
            self.cycles_aborted(),
            self.alerts_dispatched
        )
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct PipelineOrchestrator {
    oracle: Arc<dyn ForecastOracle>,
    sink: Arc<dyn AlertSink>,
    classifier: HazardClassifier,
    store: ExportStore,
    readings: Vec<Reading>,
    stats: PipelineStats,
}

impl PipelineOrchestrator {
    pub fn new(
        oracle: Arc<dyn ForecastOracle>,
        sink: Arc<dyn AlertSink>,
        classifier: HazardClassifier,
        store: ExportStore,
    ) -> Self {
        Self {
            oracle,
            sink,
            classifier,
            store,
            readings: Vec::new(),
            stats: PipelineStats::default(),
        }
    }

    pub const fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Every reading received so far, oldest first.
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Count a frame the assembler had to discard.
    pub fn record_frame_error(&mut self, error: &FrameError) {
        self.stats.frame_errors += 1;
        warn!(error = %error, "❌ Frame discarded");
    }

    /// Run one frame through every stage.
    pub async fn run_cycle(&mut self, frame: RawFrame) -> CycleReport {
        self.stats.frames_received += 1;
        let mut report = CycleReport::new();

        if let Err((stage, error)) = self.execute(&frame, &mut report).await {
            *self.stats.aborts.entry(stage).or_default() += 1;
            match stage {
                Stage::Parsing | Stage::Validated => {
                    warn!(stage = %stage, error = %error, raw = %frame, "❌ Frame decode failed, cycle discarded");
                }
                _ => warn!(stage = %stage, error = %error, "⚠️ Cycle aborted"),
            }
            report.outcome = CycleOutcome::Aborted { stage, error };
        } else {
            self.stats.cycles_completed += 1;
        }
        report
    }

    async fn execute(
        &mut self,
        frame: &RawFrame,
        report: &mut CycleReport,
    ) -> Result<(), (Stage, CycleError)> {
        let object = parse_frame(frame).map_err(|e| (Stage::Parsing, e.into()))?;
        let reading = extract_reading(&object).map_err(|e| (Stage::Validated, e.into()))?;
        info!(steps = reading.steps(), "✅ Reading decoded");

        let now = Local::now();
        let file_ts = now.format(FILE_TIMESTAMP_FORMAT).to_string();

        // Persisted: the log always grows, the export may fail
        self.readings.push(reading.clone());
        self.stats.readings_logged += 1;
        let exported = self.store.write_readings_csv(&self.readings, &file_ts).await;
        match exported {
            Ok(path) => {
                info!("💾 Saved {}", path.display());
                report.artifacts.push(path);
            }
            Err(e) => self.record_persistence_failure(Stage::Persisted, e, report),
        }

        info!("📡 Requesting forecast from {}", self.oracle.endpoint());
        let forecast = self
            .oracle
            .forecast(&reading)
            .await
            .map_err(|e| (Stage::Forecasted, e.into()))?;

        let summary = build_summary(
            &self.classifier,
            &forecast,
            reading.latest(),
            now.format(SUMMARY_TIMESTAMP_FORMAT).to_string(),
        );
        info!(status = %summary.status, "🧭 Outlook: {}", summary.joined_alerts(" | "));
        let saved = self.store.write_summary(&summary, &file_ts).await;
        match saved {
            Ok(path) => {
                info!("📦 Saved summary: {}", path.display());
                report.artifacts.push(path);
            }
            Err(e) => self.record_persistence_failure(Stage::Summarized, e, report),
        }

        let message = format_alert(&file_ts, &summary);
        report.summary = Some(summary);
        report.alert = Some(message.clone());

        self.sink
            .dispatch(&message)
            .await
            .map_err(|e| (Stage::Dispatched, e.into()))?;
        self.stats.alerts_dispatched += 1;
        Ok(())
    }

    fn record_persistence_failure(
        &mut self,
        stage: Stage,
        error: PersistenceError,
        report: &mut CycleReport,
    ) {
        self.stats.persistence_failures += 1;
        warn!(stage = %stage, error = %error, "💾 Persistence failed, continuing");
        report.persistence_failures.push(error);
    }
}

// ============================================================================
// Frame Decoding
// ============================================================================

/// Decode a frame into a JSON object.
pub fn parse_frame(frame: &RawFrame) -> Result<Map<String, Value>, FrameDecodeError> {
    match serde_json::from_str(frame.as_str())? {
        Value::Object(map) => Ok(map),
        _ => Err(FrameDecodeError::NotAnObject),
    }
}

/// Pull the five channels out of a decoded frame.
///
/// Missing keys become empty series; lengths are not checked here.
pub fn extract_reading(object: &Map<String, Value>) -> Result<Reading, FrameDecodeError> {
    let series = |dimension: Dimension| -> Result<Vec<f64>, FrameDecodeError> {
        let key = dimension.key();
        match object.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(Value::as_f64)
                .collect::<Option<Vec<_>>>()
                .ok_or(FrameDecodeError::InvalidSeries { key }),
            Some(_) => Err(FrameDecodeError::InvalidSeries { key }),
        }
    };

    Ok(Reading {
        nh3: series(Dimension::Nh3)?,
        ch4: series(Dimension::Ch4)?,
        co: series(Dimension::Co)?,
        temp: series(Dimension::Temp)?,
        humidity: series(Dimension::Humidity)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::FrameAssembler;
    use crate::messaging::LogOnlySink;
    use crate::types::{Forecast, HazardStatus, Levels, INPUT_STEPS};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const SAFE: [f64; 5] = [10.0, 500.0, 10.0, 22.0, 50.0];

    struct FixedOracle(Levels);

    #[async_trait]
    impl ForecastOracle for FixedOracle {
        async fn forecast(&self, _reading: &Reading) -> Result<Forecast, OracleError> {
            Ok(Forecast::constant(self.0))
        }

        fn endpoint(&self) -> &str {
            "fixed"
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl ForecastOracle for FailingOracle {
        async fn forecast(&self, _reading: &Reading) -> Result<Forecast, OracleError> {
            Err(OracleError::Remote("model offline".to_string()))
        }

        fn endpoint(&self) -> &str {
            "failing"
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        messages: Mutex<Vec<String>>,
        reject: bool,
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn dispatch(&self, message: &str) -> Result<(), DispatchError> {
            self.messages.lock().unwrap().push(message.to_string());
            if self.reject {
                return Err(DispatchError::Rejected {
                    status: 503,
                    body: "busy".to_string(),
                });
            }
            Ok(())
        }

        fn sink_name(&self) -> &str {
            "recording"
        }
    }

    /// Reassemble a one-object document the way the node sends it:
    /// opening brace, body, closing brace on separate lines.
    fn frame(json: &str) -> RawFrame {
        let inner = json
            .trim()
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .unwrap();
        let mut assembler = FrameAssembler::default();
        assert!(assembler.feed("{").unwrap().is_none());
        if !inner.trim().is_empty() {
            assert!(assembler.feed(inner).unwrap().is_none());
        }
        assembler.feed("}").unwrap().unwrap()
    }

    fn safe_frame() -> RawFrame {
        let reading = Reading::constant(Levels::from_row(SAFE), INPUT_STEPS);
        frame(&serde_json::to_string(&reading).unwrap())
    }

    fn orchestrator(
        dir: &std::path::Path,
        oracle: Arc<dyn ForecastOracle>,
        sink: Arc<dyn AlertSink>,
    ) -> PipelineOrchestrator {
        PipelineOrchestrator::new(
            oracle,
            sink,
            HazardClassifier::default(),
            ExportStore::new(dir.join("exports"), dir.join("summaries")),
        )
    }

    #[test]
    fn test_extract_missing_keys_become_empty() {
        let object = parse_frame(&frame(r#"{"nh3": [1, 2.5]}"#)).unwrap();
        let reading = extract_reading(&object).unwrap();
        assert_eq!(reading.nh3, vec![1.0, 2.5]);
        assert!(reading.ch4.is_empty());
        assert!(reading.humidity.is_empty());
    }

    #[test]
    fn test_extract_rejects_non_numeric_series() {
        let object = parse_frame(&frame(r#"{"co": [1, "x"]}"#)).unwrap();
        assert!(matches!(
            extract_reading(&object),
            Err(FrameDecodeError::InvalidSeries { key: "co" })
        ));
        let object = parse_frame(&frame(r#"{"temp": 21.5}"#)).unwrap();
        assert!(matches!(
            extract_reading(&object),
            Err(FrameDecodeError::InvalidSeries { key: "temp" })
        ));
    }

    #[tokio::test]
    async fn test_safe_cycle_completes_and_dispatches() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let mut orch = orchestrator(
            dir.path(),
            Arc::new(FixedOracle(Levels::from_row(SAFE))),
            sink.clone(),
        );

        let report = orch.run_cycle(safe_frame()).await;

        assert!(report.outcome.is_completed());
        let summary = report.summary.unwrap();
        assert_eq!(summary.status, HazardStatus::Safe);
        assert_eq!(report.artifacts.len(), 2);
        let messages = sink.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Status: Safe"));
        assert!(messages[0].ends_with("Alerts: ✅ No hazards detected."));
        assert_eq!(orch.stats().alerts_dispatched, 1);
        assert_eq!(orch.stats().cycles_completed, 1);
    }

    #[tokio::test]
    async fn test_malformed_frame_aborts_at_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let mut orch = orchestrator(dir.path(), Arc::new(FixedOracle(Levels::default())), sink.clone());

        let report = orch.run_cycle(frame("{nh3: [1,2]}")).await;

        assert_eq!(report.outcome.aborted_at(), Some(Stage::Parsing));
        assert!(orch.readings().is_empty());
        assert!(sink.messages.lock().unwrap().is_empty());
        assert_eq!(orch.stats().aborts_at(Stage::Parsing), 1);
    }

    /// A series that is not a number array is rejected before the reading
    /// reaches the cumulative export.
    #[tokio::test]
    async fn test_non_numeric_series_aborts_before_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let mut orch = orchestrator(dir.path(), Arc::new(FixedOracle(Levels::default())), sink.clone());

        let report = orch.run_cycle(frame(r#"{"nh3": [1, 2], "co": [1, "x"]}"#)).await;

        assert_eq!(report.outcome.aborted_at(), Some(Stage::Validated));
        assert!(report.artifacts.is_empty());
        assert!(orch.readings().is_empty());
        assert_eq!(orch.stats().readings_logged, 0);
        assert!(!dir.path().join("exports").exists());
        assert!(sink.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oracle_failure_aborts_after_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let mut orch = orchestrator(dir.path(), Arc::new(FailingOracle), sink.clone());

        let report = orch.run_cycle(safe_frame()).await;

        assert!(matches!(
            report.outcome,
            CycleOutcome::Aborted {
                stage: Stage::Forecasted,
                error: CycleError::Oracle(OracleError::Remote(_))
            }
        ));
        assert_eq!(report.artifacts.len(), 1);
        assert!(report.summary.is_none());
        assert_eq!(orch.readings().len(), 1);
        assert!(sink.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_dispatch_keeps_summary() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink {
            reject: true,
            ..RecordingSink::default()
        });
        let mut orch = orchestrator(dir.path(), Arc::new(FixedOracle(Levels::from_row(SAFE))), sink);

        let report = orch.run_cycle(safe_frame()).await;

        assert_eq!(report.outcome.aborted_at(), Some(Stage::Dispatched));
        assert!(report.summary.is_some());
        assert_eq!(orch.stats().readings_logged, 1);
        assert_eq!(orch.stats().alerts_dispatched, 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_block_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("exports"), b"file, not dir").unwrap();
        std::fs::write(dir.path().join("summaries"), b"file, not dir").unwrap();
        let sink = Arc::new(RecordingSink::default());
        let mut orch = orchestrator(dir.path(), Arc::new(FixedOracle(Levels::from_row(SAFE))), sink.clone());

        let report = orch.run_cycle(safe_frame()).await;

        assert!(report.outcome.is_completed());
        assert_eq!(report.persistence_failures.len(), 2);
        assert!(report.artifacts.is_empty());
        assert_eq!(sink.messages.lock().unwrap().len(), 1);
        assert_eq!(orch.stats().persistence_failures, 2);
    }

    #[tokio::test]
    async fn test_cumulative_log_grows_per_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(
            dir.path(),
            Arc::new(FixedOracle(Levels::from_row(SAFE))),
            Arc::new(LogOnlySink),
        );

        orch.run_cycle(safe_frame()).await;
        let report = orch.run_cycle(safe_frame()).await;

        assert_eq!(orch.readings().len(), 2);
        let csv = std::fs::read_to_string(&report.artifacts[0]).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_empty_reading_uses_zero_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(
            dir.path(),
            Arc::new(FixedOracle(Levels::from_row(SAFE))),
            Arc::new(LogOnlySink),
        );

        let report = orch.run_cycle(frame("{}")).await;

        assert!(report.outcome.is_completed());
        assert_eq!(report.summary.unwrap().current, Levels::default());
    }
}
