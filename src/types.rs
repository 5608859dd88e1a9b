//! Core types for the proctoring engine
//!
//! This module defines the data that flows through a session: the frame signals
//! coming from perception, the violation events the engine emits, and the
//! session record those events accumulate into.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::EventLedger;
use crate::scoring::{self, INITIAL_SCORE};

/// Violation category (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    FocusLoss,
    FaceMissing,
    MultipleFaces,
    UnauthorizedObject,
}

impl ViolationKind {
    pub const ALL: [ViolationKind; 4] = [
        ViolationKind::FocusLoss,
        ViolationKind::FaceMissing,
        ViolationKind::MultipleFaces,
        ViolationKind::UnauthorizedObject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::FocusLoss => "focus_loss",
            ViolationKind::FaceMissing => "face_missing",
            ViolationKind::MultipleFaces => "multiple_faces",
            ViolationKind::UnauthorizedObject => "unauthorized_object",
        }
    }

    /// Fixed severity mapping for each kind
    pub fn severity(&self) -> Severity {
        match self {
            ViolationKind::FocusLoss => Severity::Medium,
            ViolationKind::FaceMissing => Severity::High,
            ViolationKind::MultipleFaces => Severity::Medium,
            ViolationKind::UnauthorizedObject => Severity::High,
        }
    }
}

/// Violation severity, drives score deduction and report grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Kind-specific event payload.
///
/// The variant determines the event kind, so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDetails {
    FocusLoss {
        /// Time the gaze stayed away before the event fired (seconds)
        elapsed_secs: f64,
        /// Configured debounce threshold (seconds)
        threshold_secs: u64,
    },
    FaceMissing {
        /// Time no face was visible before the event fired (seconds)
        elapsed_secs: f64,
        /// Configured debounce threshold (seconds)
        threshold_secs: u64,
    },
    MultipleFaces {
        face_count: u32,
    },
    UnauthorizedObject {
        label: String,
        confidence: f64,
    },
}

impl EventDetails {
    pub fn kind(&self) -> ViolationKind {
        match self {
            EventDetails::FocusLoss { .. } => ViolationKind::FocusLoss,
            EventDetails::FaceMissing { .. } => ViolationKind::FaceMissing,
            EventDetails::MultipleFaces { .. } => ViolationKind::MultipleFaces,
            EventDetails::UnauthorizedObject { .. } => ViolationKind::UnauthorizedObject,
        }
    }

    /// Human-readable summary, deterministic given the payload
    pub fn describe(&self) -> String {
        match self {
            EventDetails::FocusLoss { threshold_secs, .. } => {
                format!("Candidate looking away for more than {threshold_secs} seconds")
            }
            EventDetails::FaceMissing { threshold_secs, .. } => {
                format!("No face detected for more than {threshold_secs} seconds")
            }
            EventDetails::MultipleFaces { face_count } => {
                format!("{face_count} faces detected in frame")
            }
            EventDetails::UnauthorizedObject { label, .. } => format!("Detected {label} in frame"),
        }
    }
}

/// A single violation, immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationEvent {
    /// Unique event identifier
    pub id: Uuid,
    /// Violation category
    pub kind: ViolationKind,
    /// When the engine detected the violation
    pub timestamp: DateTime<Utc>,
    /// Human-readable summary
    pub description: String,
    /// Severity derived from the kind
    pub severity: Severity,
    /// Kind-specific payload
    pub details: EventDetails,
}

impl ViolationEvent {
    pub fn new(details: EventDetails, timestamp: DateTime<Utc>) -> Self {
        let kind = details.kind();
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp,
            description: details.describe(),
            severity: kind.severity(),
            details,
        }
    }
}

/// A 2D landmark produced by the face model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazePoint {
    pub x: f64,
    pub y: f64,
}

/// An object classified in the frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Class label as reported by the model (e.g. "cell phone")
    pub label: String,
    /// Classification confidence (0-1)
    pub confidence: f64,
}

/// Per-frame perception output fed into the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSignal {
    /// Number of faces visible
    pub face_count: u32,
    /// Landmarks of the primary face, when the model produced them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gaze_keypoints: Option<Vec<GazePoint>>,
    /// Classified objects in the frame
    #[serde(default)]
    pub detected_objects: Vec<DetectedObject>,
}

impl FrameSignal {
    /// A frame with exactly one face and no keypoints or objects
    pub fn single_face() -> Self {
        Self {
            face_count: 1,
            ..Default::default()
        }
    }

    pub fn with_faces(face_count: u32) -> Self {
        Self {
            face_count,
            ..Default::default()
        }
    }

    pub fn with_keypoints(mut self, keypoints: Vec<GazePoint>) -> Self {
        self.gaze_keypoints = Some(keypoints);
        self
    }

    pub fn with_object(mut self, label: impl Into<String>, confidence: f64) -> Self {
        self.detected_objects.push(DetectedObject {
            label: label.into(),
            confidence,
        });
        self
    }
}

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Active,
    Closed,
}

/// Score after a single deduction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSample {
    pub event_id: Uuid,
    pub at: DateTime<Utc>,
    pub score_after: u8,
}

/// One candidate's proctoring session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: Uuid,
    candidate_label: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    status: SessionStatus,
    ledger: EventLedger,
    integrity_score: u8,
    score_timeline: Vec<ScoreSample>,
}

impl Session {
    pub(crate) fn new(candidate_label: String, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_label,
            started_at,
            ended_at: None,
            status: SessionStatus::Created,
            ledger: EventLedger::new(),
            integrity_score: INITIAL_SCORE,
            score_timeline: Vec::new(),
        }
    }

    pub(crate) fn activate(&mut self) {
        if self.status == SessionStatus::Created {
            self.status = SessionStatus::Active;
        }
    }

    /// Append an event and fold it into the score. Ignored unless active.
    pub(crate) fn record(&mut self, event: ViolationEvent) {
        if self.status != SessionStatus::Active {
            return;
        }
        self.integrity_score = scoring::deduct(self.integrity_score, event.severity);
        self.score_timeline.push(ScoreSample {
            event_id: event.id,
            at: event.timestamp,
            score_after: self.integrity_score,
        });
        self.ledger.append(event);
    }

    pub(crate) fn close(mut self, now: DateTime<Utc>) -> ClosedSession {
        // endedAt never precedes startedAt, even with a clock that stepped back
        self.ended_at = Some(now.max(self.started_at));
        self.status = SessionStatus::Closed;
        ClosedSession {
            session: self,
            recording: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn candidate_label(&self) -> &str {
        &self.candidate_label
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn ledger(&self) -> &EventLedger {
        &self.ledger
    }

    pub fn events(&self) -> &[ViolationEvent] {
        self.ledger.events()
    }

    pub fn integrity_score(&self) -> u8 {
        self.integrity_score
    }

    pub fn score_timeline(&self) -> &[ScoreSample] {
        &self.score_timeline
    }
}

/// A session that has been ended. Frozen: no operation mutates its events or score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedSession {
    session: Session,
    recording: Option<RecordingMetadata>,
}

impl ClosedSession {
    pub(crate) fn with_recording(mut self, recording: RecordingMetadata) -> Self {
        self.recording = Some(recording);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn recording(&self) -> Option<&RecordingMetadata> {
        self.recording.as_ref()
    }

    pub fn ended_at(&self) -> DateTime<Utc> {
        self.session.ended_at.unwrap_or(self.session.started_at)
    }

    pub fn duration(&self) -> Duration {
        self.ended_at() - self.session.started_at
    }
}

/// Media blob handed over by the recording collaborator at session end
#[derive(Debug, Clone)]
pub struct Recording {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// What the report keeps about a recording. The blob itself is not retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub mime_type: String,
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 of the blob
    pub sha256: String,
    /// Suggested file name for the exported media
    pub file_name: String,
}
