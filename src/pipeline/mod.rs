//! Ingestion Pipeline
//!
//! ```text
//! device line ─▶ FrameAssembler ─▶ RawFrame
//!                                     │
//!   Parsing ─▶ Validated ─▶ Persisted ─▶ Forecasted ─▶ Summarized ─▶ Dispatched
//!      │           │            │ (non-fatal)  │            │ (non-fatal)   │
//!      └───────────┴────────────┴──── Aborted(stage) ◀──────┴───────────────┘
//! ```
//!
//! One frame is one cycle; cycles run strictly one after another on a
//! single task. A cycle failure is logged and discarded. Only loss of the
//! device or a stop signal ends the loop.

pub mod orchestrator;
pub mod processing_loop;

pub use orchestrator::{
    CycleError, CycleOutcome, CycleReport, FrameDecodeError, PipelineOrchestrator, PipelineStats,
    Stage,
};
pub use processing_loop::IngestionLoop;
