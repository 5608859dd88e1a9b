//! Engine configuration
//!
//! Every field has a default, so a partial JSON document (or none at all) yields a
//! working configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ProctorError;

/// Default face-absence debounce (seconds)
pub const DEFAULT_FACE_ABSENCE_SECS: u64 = 10;

/// Default gaze-away debounce (seconds)
pub const DEFAULT_GAZE_AWAY_SECS: u64 = 5;

/// Default window for the live status view (seconds)
pub const DEFAULT_STATUS_WINDOW_SECS: u64 = 10;

/// Object labels that are not allowed in frame
pub const DEFAULT_DISALLOWED_OBJECTS: [&str; 4] = ["cell phone", "book", "laptop", "person"];

/// Landmark indices and threshold for the gaze heuristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// Index of the nose-tip landmark
    pub nose_index: usize,
    /// Index of the first left-eye landmark
    pub left_eye_index: usize,
    /// Index of the first right-eye landmark
    pub right_eye_index: usize,
    /// Horizontal nose offset from the eye midpoint beyond which gaze counts as away
    pub max_nose_offset: f64,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            nose_index: 1,
            left_eye_index: 33,
            right_eye_index: 362,
            max_nose_offset: 50.0,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds without a face before a face-missing violation
    pub face_absence_secs: u64,
    /// Seconds of looking away before a focus-loss violation
    pub gaze_away_secs: u64,
    /// Disallowed object labels (case-insensitive substring match)
    pub disallowed_objects: Vec<String>,
    /// Gaze heuristic parameters
    pub gaze: GazeConfig,
    /// How far back the live status view looks (seconds)
    pub status_window_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            face_absence_secs: DEFAULT_FACE_ABSENCE_SECS,
            gaze_away_secs: DEFAULT_GAZE_AWAY_SECS,
            disallowed_objects: DEFAULT_DISALLOWED_OBJECTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            gaze: GazeConfig::default(),
            status_window_secs: DEFAULT_STATUS_WINDOW_SECS,
        }
    }
}

impl EngineConfig {
    pub fn face_absence_delay(&self) -> Duration {
        Duration::seconds(self.face_absence_secs as i64)
    }

    pub fn gaze_away_delay(&self) -> Duration {
        Duration::seconds(self.gaze_away_secs as i64)
    }

    pub fn status_window(&self) -> Duration {
        Duration::seconds(self.status_window_secs as i64)
    }

    /// Whether a detected label matches any disallowed entry
    pub fn is_disallowed(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        self.disallowed_objects
            .iter()
            .any(|disallowed| label.contains(&disallowed.to_lowercase()))
    }

    pub fn validate(&self) -> Result<(), ProctorError> {
        // Upper bound keeps the seconds-to-Duration conversion in range
        const MAX_DELAY_SECS: u64 = 86_400;

        if self.face_absence_secs == 0 || self.face_absence_secs > MAX_DELAY_SECS {
            return Err(ProctorError::InvalidConfig(format!(
                "face_absence_secs must be between 1 and {MAX_DELAY_SECS}"
            )));
        }
        if self.gaze_away_secs == 0 || self.gaze_away_secs > MAX_DELAY_SECS {
            return Err(ProctorError::InvalidConfig(format!(
                "gaze_away_secs must be between 1 and {MAX_DELAY_SECS}"
            )));
        }
        if self.status_window_secs > MAX_DELAY_SECS {
            return Err(ProctorError::InvalidConfig(format!(
                "status_window_secs must be at most {MAX_DELAY_SECS}"
            )));
        }
        if self.disallowed_objects.iter().any(|o| o.trim().is_empty()) {
            return Err(ProctorError::InvalidConfig(
                "disallowed_objects must not contain empty labels".to_string(),
            ));
        }
        if !self.gaze.max_nose_offset.is_finite() || self.gaze.max_nose_offset <= 0.0 {
            return Err(ProctorError::InvalidConfig(
                "gaze.max_nose_offset must be a positive number".to_string(),
            ));
        }
        Ok(())
    }

    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ProctorError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ProctorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
