//! Integrity scoring
//!
//! Every emitted event deducts a fixed penalty from the session score according to
//! its severity. The score starts at 100, floors at 0, and is never restored.

use serde::{Deserialize, Serialize};

use crate::types::Severity;

/// Score a session starts with
pub const INITIAL_SCORE: u8 = 100;

/// Points deducted for one event of the given severity
pub fn penalty(severity: Severity) -> u8 {
    match severity {
        Severity::High => 10,
        Severity::Medium => 5,
        Severity::Low => 2,
    }
}

/// Apply one event's deduction, flooring at 0
pub fn deduct(current: u8, severity: Severity) -> u8 {
    current.min(INITIAL_SCORE).saturating_sub(penalty(severity))
}

/// Display band for a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Poor,
}

impl ScoreBand {
    pub fn for_score(score: u8) -> Self {
        if score >= 80 {
            ScoreBand::Excellent
        } else if score >= 60 {
            ScoreBand::Good
        } else {
            ScoreBand::Poor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_penalty_table() {
        assert_eq!(penalty(Severity::High), 10);
        assert_eq!(penalty(Severity::Medium), 5);
        assert_eq!(penalty(Severity::Low), 2);
    }

    #[test]
    fn test_deduct_floors_at_zero() {
        assert_eq!(deduct(100, Severity::High), 90);
        assert_eq!(deduct(7, Severity::High), 0);
        assert_eq!(deduct(1, Severity::Low), 0);
        assert_eq!(deduct(0, Severity::Medium), 0);
    }

    #[test]
    fn test_deduct_never_exceeds_initial() {
        assert_eq!(deduct(250, Severity::Low), 98);
    }

    #[test]
    fn test_repeated_deductions_are_monotonic() {
        let mut score = INITIAL_SCORE;
        for severity in [Severity::Low, Severity::Medium, Severity::High].iter().cycle().take(40) {
            let next = deduct(score, *severity);
            assert!(next <= score);
            score = next;
        }
        assert_eq!(score, 0);
    }

    #[test]
    fn test_score_bands() {
        assert_eq!(ScoreBand::for_score(100), ScoreBand::Excellent);
        assert_eq!(ScoreBand::for_score(80), ScoreBand::Excellent);
        assert_eq!(ScoreBand::for_score(79), ScoreBand::Good);
        assert_eq!(ScoreBand::for_score(60), ScoreBand::Good);
        assert_eq!(ScoreBand::for_score(59), ScoreBand::Poor);
        assert_eq!(ScoreBand::for_score(0), ScoreBand::Poor);
    }
}
