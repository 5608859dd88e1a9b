//! Replay orchestration
//!
//! Drives an engine through a recorded stream of frame records, using each record's
//! timestamp as the engine's clock. The session opens at the first record and
//! closes at the last one.

use log::info;

use crate::clock::ManualClock;
use crate::config::EngineConfig;
use crate::engine::ProctoringEngine;
use crate::error::ProctorError;
use crate::report::{ReportBuilder, SessionReport};
use crate::schema::{FrameRecord, FrameRecordAdapter};
use crate::types::{ClosedSession, Recording};

/// Convert an NDJSON frame stream to report JSON (stateless, one-shot).
///
/// # Arguments
/// * `ndjson` - proctor.frame_signal.v1 records, one per line
/// * `candidate` - Candidate label for the session
///
/// # Returns
/// Pretty-printed report JSON
pub fn frames_to_report(ndjson: &str, candidate: &str) -> Result<String, ProctorError> {
    let records = FrameRecordAdapter::parse_ndjson(ndjson)?;
    let report = Replayer::new(EngineConfig::default())?.run(&records, candidate, None)?;
    report.to_json_pretty()
}

/// Replays recorded frames through a fresh engine per run
pub struct Replayer {
    config: EngineConfig,
}

impl Replayer {
    pub fn new(config: EngineConfig) -> Result<Self, ProctorError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Replay `records` as one session and return the closed session
    pub fn replay(
        &self,
        records: &[FrameRecord],
        candidate: &str,
        recording: Option<&Recording>,
    ) -> Result<ClosedSession, ProctorError> {
        let first = records
            .first()
            .ok_or_else(|| ProctorError::InvalidInput("no frame records to replay".to_string()))?;

        for record in records {
            record.validate()?;
        }
        FrameRecordAdapter::check_ordering(records)?;

        let clock = ManualClock::new(first.timestamp);
        let mut engine = ProctoringEngine::with_clock(self.config.clone(), clock.clone())?;
        engine.start(candidate)?;

        for record in records {
            clock.set(record.timestamp);
            engine.analyze_outcome(record.to_outcome());
        }

        let closed = match recording {
            Some(recording) => engine.end_with_recording(recording)?,
            None => engine.end()?,
        };
        info!(
            "replayed {} frames for '{}'",
            records.len(),
            closed.session().candidate_label()
        );
        Ok(closed)
    }

    /// Replay `records` and build the report
    pub fn run(
        &self,
        records: &[FrameRecord],
        candidate: &str,
        recording: Option<&Recording>,
    ) -> Result<SessionReport, ProctorError> {
        let closed = self.replay(records, candidate, recording)?;
        Ok(ReportBuilder::build(&closed))
    }
}
