//! Live session views for the driving UI
//!
//! Everything here is derived from the session's ledger on demand; nothing is
//! tracked alongside it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::EventLedger;
use crate::scoring::ScoreBand;
use crate::types::{EventDetails, Session, ViolationKind};

/// Read-only view of the active session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub session_id: Uuid,
    pub candidate_label: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: i64,
    pub integrity_score: u8,
    pub score_band: ScoreBand,
    /// Running count per kind, recomputed from the ledger
    pub event_counts: BTreeMap<ViolationKind, usize>,
}

impl SessionHandle {
    pub fn from_session(session: &Session, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session.id(),
            candidate_label: session.candidate_label().to_string(),
            started_at: session.started_at(),
            elapsed_secs: (now - session.started_at()).num_seconds().max(0),
            integrity_score: session.integrity_score(),
            score_band: ScoreBand::for_score(session.integrity_score()),
            event_counts: session.ledger().counts_by_kind(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceStatus {
    FaceDetected,
    NoFaceDetected,
    MultipleFaces,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusStatus {
    Focused,
    LookingAway,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ObjectStatus {
    Clear,
    Detected { label: String },
}

/// Indicator state built from recent violations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStatus {
    pub face: FaceStatus,
    pub focus: FocusStatus,
    pub objects: ObjectStatus,
}

impl LiveStatus {
    /// Status from events detected at or after `since`
    pub fn from_ledger(ledger: &EventLedger, since: DateTime<Utc>) -> Self {
        let face = if ledger.latest_since(ViolationKind::FaceMissing, since).is_some() {
            FaceStatus::NoFaceDetected
        } else if ledger.latest_since(ViolationKind::MultipleFaces, since).is_some() {
            FaceStatus::MultipleFaces
        } else {
            FaceStatus::FaceDetected
        };

        let focus = if ledger.latest_since(ViolationKind::FocusLoss, since).is_some() {
            FocusStatus::LookingAway
        } else {
            FocusStatus::Focused
        };

        let objects = match ledger
            .latest_since(ViolationKind::UnauthorizedObject, since)
            .map(|e| &e.details)
        {
            Some(EventDetails::UnauthorizedObject { label, .. }) => ObjectStatus::Detected {
                label: label.clone(),
            },
            _ => ObjectStatus::Clear,
        };

        Self {
            face,
            focus,
            objects,
        }
    }
}
