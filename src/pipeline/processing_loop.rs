//! Ingestion loop: device lines -> frames -> pipeline cycles.
//!
//! Runs until the device goes away or the cancellation token fires. Cycle
//! failures never stop it; only [`DeviceError`]s do. The device session is
//! closed on every exit path and a final statistics block is logged.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::orchestrator::{PipelineOrchestrator, PipelineStats, Stage};
use crate::acquisition::{DeviceError, FrameAssembler, LineRead, LineSource};

const BANNER: &str =
    "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Owns everything a running station needs for the lifetime of [`run`](Self::run).
pub struct IngestionLoop<S: LineSource> {
    source: S,
    assembler: FrameAssembler,
    orchestrator: PipelineOrchestrator,
    cancel_token: CancellationToken,
}

impl<S: LineSource> IngestionLoop<S> {
    pub const fn new(
        source: S,
        assembler: FrameAssembler,
        orchestrator: PipelineOrchestrator,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            source,
            assembler,
            orchestrator,
            cancel_token,
        }
    }

    pub const fn stats(&self) -> &PipelineStats {
        self.orchestrator.stats()
    }

    /// Run until the device ends or cancellation.
    ///
    /// Returns the final statistics on a clean stop, or the device error that
    /// ended the loop. Statistics stay readable through [`stats`](Self::stats)
    /// either way.
    pub async fn run(&mut self) -> Result<PipelineStats, DeviceError> {
        info!("📡 Waiting for frames from {}...", self.source.source_name());
        info!("{BANNER}");

        let result = self.drive().await;
        self.source.close().await;

        let stats = self.orchestrator.stats().clone();
        log_final_statistics(&stats, self.assembler.noise_lines());

        match result {
            Ok(()) => Ok(stats),
            Err(e) => {
                error!(error = %e, "Device lost, stopping ingestion");
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<(), DeviceError> {
        loop {
            if self.cancel_token.is_cancelled() {
                info!("🛑 Stopping data collection");
                return Ok(());
            }

            let read = tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!("🛑 Stopping data collection");
                    return Ok(());
                }
                result = self.source.read_line() => result?,
            };

            let line = match read {
                LineRead::Line(line) => line,
                LineRead::Idle => {
                    debug!("No data within read timeout");
                    continue;
                }
            };
            debug!(line = %line, "Received data");

            match self.assembler.feed(&line) {
                Ok(Some(frame)) => {
                    self.orchestrator.run_cycle(frame).await;
                }
                Ok(None) => {}
                Err(e) => self.orchestrator.record_frame_error(&e),
            }
        }
    }
}

fn log_final_statistics(stats: &PipelineStats, noise_lines: u64) {
    info!("");
    info!("{BANNER}");
    info!("📊 FINAL STATISTICS");
    info!("{BANNER}");
    info!("   Frames Received:      {}", stats.frames_received);
    info!("   Frames Discarded:     {}", stats.frame_errors);
    info!("   Noise Lines Skipped:  {}", noise_lines);
    info!("   Readings Logged:      {}", stats.readings_logged);
    info!("   Cycles Completed:     {}", stats.cycles_completed);
    info!(
        "   Cycles Aborted:       {} (decode {}, oracle {}, dispatch {})",
        stats.cycles_aborted(),
        stats.aborts_at(Stage::Parsing) + stats.aborts_at(Stage::Validated),
        stats.aborts_at(Stage::Forecasted),
        stats.aborts_at(Stage::Dispatched)
    );
    info!("   Persistence Failures: {}", stats.persistence_failures);
    info!("   Alerts Dispatched:    {}", stats.alerts_dispatched);
    info!("{BANNER}");
}
