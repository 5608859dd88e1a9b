//! Session report builder
//!
//! Projects a closed session into a flat, serializable report. Building is pure:
//! the report carries no generation timestamp or instance identifier, so building
//! twice from the same session yields equal output.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::ProctorError;
use crate::scoring::ScoreBand;
use crate::types::{
    ClosedSession, Recording, RecordingMetadata, ScoreSample, Severity, ViolationEvent,
    ViolationKind,
};
use crate::{ENGINE_VERSION, PRODUCER_NAME};

/// Current report schema version
pub const REPORT_VERSION: &str = "proctor.session_report.v1";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
}

/// Exportable summary of a closed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub session_id: Uuid,
    pub candidate: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: f64,
    /// Duration as MM:SS
    pub duration_display: String,
    pub integrity_score: u8,
    pub score_band: ScoreBand,
    pub total_violations: usize,
    /// Every kind is present, zero when no events of that kind occurred
    pub violations_by_kind: BTreeMap<ViolationKind, usize>,
    /// Every severity is present, zero when no events of that severity occurred
    pub violations_by_severity: BTreeMap<Severity, usize>,
    pub events: Vec<ViolationEvent>,
    pub score_timeline: Vec<ScoreSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording: Option<RecordingMetadata>,
}

impl SessionReport {
    pub fn to_json(&self) -> Result<String, ProctorError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ProctorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ProctorError> {
        Ok(serde_json::from_str(json)?)
    }

    /// `interview-report-{candidate}-{YYYY-MM-DD}.json`
    pub fn suggested_file_name(&self) -> String {
        format!(
            "interview-report-{}-{}.json",
            file_safe(&self.candidate),
            self.ended_at.format("%Y-%m-%d")
        )
    }
}

/// Builds reports from closed sessions
pub struct ReportBuilder;

impl ReportBuilder {
    pub fn build(closed: &ClosedSession) -> SessionReport {
        let session = closed.session();
        let ledger = session.ledger();

        let mut violations_by_kind: BTreeMap<ViolationKind, usize> =
            ViolationKind::ALL.iter().map(|k| (*k, 0)).collect();
        violations_by_kind.extend(ledger.counts_by_kind());

        let mut violations_by_severity: BTreeMap<Severity, usize> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();
        violations_by_severity.extend(ledger.counts_by_severity());

        let duration = closed.duration();

        SessionReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
            },
            session_id: session.id(),
            candidate: session.candidate_label().to_string(),
            started_at: session.started_at(),
            ended_at: closed.ended_at(),
            duration_secs: duration_secs(duration),
            duration_display: format_mm_ss(duration),
            integrity_score: session.integrity_score(),
            score_band: ScoreBand::for_score(session.integrity_score()),
            total_violations: ledger.len(),
            violations_by_kind,
            violations_by_severity,
            events: ledger.events().to_vec(),
            score_timeline: session.score_timeline().to_vec(),
            recording: closed.recording().cloned(),
        }
    }

    pub fn build_json(closed: &ClosedSession) -> Result<String, ProctorError> {
        Self::build(closed).to_json_pretty()
    }
}

/// Duration in fractional seconds (millisecond precision)
pub fn duration_secs(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}

/// Format a duration as zero-padded `MM:SS`; minutes may exceed 59
pub fn format_mm_ss(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Reference a recorded blob without keeping it
pub fn recording_metadata(
    recording: &Recording,
    candidate: &str,
    ended_at: DateTime<Utc>,
) -> RecordingMetadata {
    let digest = Sha256::digest(&recording.bytes);
    let extension = match recording.mime_type.split(';').next().map(str::trim) {
        Some("video/webm") => "webm",
        Some("video/mp4") => "mp4",
        _ => "bin",
    };

    RecordingMetadata {
        mime_type: recording.mime_type.clone(),
        size_bytes: recording.bytes.len() as u64,
        sha256: format!("{digest:x}"),
        file_name: format!(
            "interview-recording-{}-{}.{}",
            file_safe(candidate),
            ended_at.format("%Y-%m-%d"),
            extension
        ),
    }
}

/// Replace characters that are awkward in file names
fn file_safe(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
