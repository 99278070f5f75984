//! Artifact Storage
//!
//! Write-only export of what each cycle saw and concluded:
//!
//! - `exports/sensor_readings_<ts>.csv`: every reading received since
//!   startup, one row per frame, rewritten in full each cycle
//! - `summaries/reticulum_summary_<ts>.json`: the cycle's hazard summary
//!
//! Nothing here is read back. Failures are reported to the caller, which
//! logs them and carries on.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::StorageConfig;
use crate::types::{Dimension, HazardSummary, Reading};

/// CSV header row, matching the frame keys.
pub const CSV_HEADER: &str = "nh3,ch4,co,temp,humidity";

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("storage error ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Timestamped artifact writer rooted at two directories.
#[derive(Debug, Clone)]
pub struct ExportStore {
    exports_dir: PathBuf,
    summaries_dir: PathBuf,
}

impl ExportStore {
    pub fn new(exports_dir: impl Into<PathBuf>, summaries_dir: impl Into<PathBuf>) -> Self {
        Self {
            exports_dir: exports_dir.into(),
            summaries_dir: summaries_dir.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.exports_dir, &config.summaries_dir)
    }

    pub fn exports_dir(&self) -> &Path {
        &self.exports_dir
    }

    pub fn summaries_dir(&self) -> &Path {
        &self.summaries_dir
    }

    /// Write the full reading log to `sensor_readings_<timestamp>.csv`.
    pub async fn write_readings_csv(
        &self,
        readings: &[Reading],
        timestamp: &str,
    ) -> Result<PathBuf, PersistenceError> {
        let path = self
            .exports_dir
            .join(format!("sensor_readings_{timestamp}.csv"));
        write_file(&self.exports_dir, &path, render_csv(readings).as_bytes()).await?;
        debug!(path = %path.display(), rows = readings.len(), "Readings exported");
        Ok(path)
    }

    /// Write one summary to `reticulum_summary_<timestamp>.json`.
    pub async fn write_summary(
        &self,
        summary: &HazardSummary,
        timestamp: &str,
    ) -> Result<PathBuf, PersistenceError> {
        let path = self
            .summaries_dir
            .join(format!("reticulum_summary_{timestamp}.json"));
        let json = serde_json::to_string_pretty(summary)?;
        write_file(&self.summaries_dir, &path, json.as_bytes()).await?;
        Ok(path)
    }
}

async fn write_file(dir: &Path, path: &Path, contents: &[u8]) -> Result<(), PersistenceError> {
    let io_err = |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    };
    tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
    tokio::fs::write(path, contents).await.map_err(io_err)
}

/// Render the reading log as CSV.
///
/// Each cell is the channel's series as a list literal (`[1.0, 2.0]`),
/// quoted when it contains a comma.
pub fn render_csv(readings: &[Reading]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + readings.len() * 256);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for reading in readings {
        let cells: Vec<String> = Dimension::ALL
            .iter()
            .map(|d| csv_cell(reading.series(*d)))
            .collect();
        let _ = writeln!(out, "{}", cells.join(","));
    }
    out
}

fn csv_cell(series: &[f64]) -> String {
    let list = format!("{series:?}");
    if list.contains(',') {
        format!("\"{list}\"")
    } else {
        list
    }
}
