//! proctor.frame_signal.v1 schema definition
//!
//! One record per analyzed frame, as produced by the perception collaborator.
//! A record either carries the frame's signal or reports that inference failed
//! for that tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PerceptionError;
use crate::types::{DetectedObject, FrameSignal, GazePoint};

/// Current schema version
pub const SCHEMA_VERSION: &str = "proctor.frame_signal.v1";

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// A timestamped perception result for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Schema version (defaults to the current version when omitted)
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// When the frame was captured
    pub timestamp: DateTime<Utc>,
    /// Number of faces visible
    #[serde(default)]
    pub face_count: u32,
    /// Landmarks of the primary face
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gaze_keypoints: Option<Vec<GazePoint>>,
    /// Classified objects
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detected_objects: Vec<DetectedObject>,
    /// Set when perception failed for this frame; the signal fields are ignored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FrameRecord {
    pub fn new(timestamp: DateTime<Utc>, signal: FrameSignal) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            timestamp,
            face_count: signal.face_count,
            gaze_keypoints: signal.gaze_keypoints,
            detected_objects: signal.detected_objects,
            error: None,
        }
    }

    pub fn failed(timestamp: DateTime<Utc>, reason: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            timestamp,
            face_count: 0,
            gaze_keypoints: None,
            detected_objects: Vec::new(),
            error: Some(reason.into()),
        }
    }

    /// Validate the record against the schema
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        if self.error.is_some() {
            return Ok(());
        }

        if let Some(points) = &self.gaze_keypoints {
            if let Some(index) = points
                .iter()
                .position(|p| !p.x.is_finite() || !p.y.is_finite())
            {
                return Err(ValidationError::NonFiniteKeypoint { index });
            }
        }

        for object in &self.detected_objects {
            if object.label.trim().is_empty() {
                return Err(ValidationError::EmptyObjectLabel);
            }
            if !(0.0..=1.0).contains(&object.confidence) {
                return Err(ValidationError::ConfidenceOutOfRange {
                    label: object.label.clone(),
                    confidence: object.confidence,
                });
            }
        }

        Ok(())
    }

    /// The perception outcome this record represents
    pub fn to_outcome(&self) -> Result<FrameSignal, PerceptionError> {
        match &self.error {
            Some(reason) => Err(PerceptionError::new(reason.clone())),
            None => Ok(FrameSignal {
                face_count: self.face_count,
                gaze_keypoints: self.gaze_keypoints.clone(),
                detected_objects: self.detected_objects.clone(),
            }),
        }
    }
}

/// Validation errors for frame records
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Gaze keypoint {index} has a non-finite coordinate")]
    NonFiniteKeypoint { index: usize },

    #[error("Detected object has an empty label")]
    EmptyObjectLabel,

    #[error("Confidence for '{label}' must be within [0, 1], got {confidence}")]
    ConfidenceOutOfRange { label: String, confidence: f64 },
}
