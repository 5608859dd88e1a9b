//! Proctor Engine - integrity monitoring for live remote interviews and exams
//!
//! The engine turns a noisy per-frame perception stream (face count, gaze keypoints,
//! classified objects) into debounced, severity-tagged violation events, an integrity
//! score, and a replayable session report:
//! frame signal → debounce/detect → ledger + scoring → closed session → report.
//!
//! ## Modules
//!
//! - **Engine**: Session lifecycle (`start` / `analyze_frame` / `end`) and detection
//! - **Report**: Deterministic projection of a closed session
//! - **Schema / Replay**: Serialized frame records and offline replay

pub mod clock;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod gaze;
pub mod ledger;
pub mod replay;
pub mod report;
pub mod schema;
pub mod scoring;
pub mod status;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::ProctoringEngine;
pub use error::{PerceptionError, ProctorError};
pub use replay::{frames_to_report, Replayer};
pub use report::{ReportBuilder, SessionReport};
pub use types::{
    ClosedSession, EventDetails, FrameSignal, Session, Severity, ViolationEvent, ViolationKind,
};

// Schema exports
pub use schema::{FrameRecord, FrameRecordAdapter, SCHEMA_VERSION};

/// Engine version embedded in every report
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "proctor-engine";
