//! Gaze-away heuristic
//!
//! Compares the nose tip with the midpoint of the two eyes: a large horizontal offset
//! means the head is turned away from the screen. This is a coarse placeholder, not a
//! gaze-direction model. It is a pure function of its inputs.

use crate::config::GazeConfig;
use crate::types::GazePoint;

/// Whether the keypoints indicate the candidate is looking away.
///
/// Keypoint sets too short to contain the configured landmarks count as not away.
pub fn is_looking_away(keypoints: &[GazePoint], config: &GazeConfig) -> bool {
    let (Some(left), Some(right), Some(nose)) = (
        keypoints.get(config.left_eye_index),
        keypoints.get(config.right_eye_index),
        keypoints.get(config.nose_index),
    ) else {
        return false;
    };

    let eye_center_x = (left.x + right.x) / 2.0;
    let offset = (nose.x - eye_center_x).abs();

    offset.is_finite() && offset > config.max_nose_offset
}
