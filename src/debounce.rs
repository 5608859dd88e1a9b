//! Poll-driven debounce timers
//!
//! A timer fires only when its condition has held continuously from the first
//! observation until the deadline. Deadlines are checked on each observation rather
//! than by a scheduled callback, so a stalled caller may see a deadline late but
//! never early, and a timer fires at most once per uninterrupted run of the
//! condition.

use chrono::{DateTime, Duration, Utc};

/// Internal countdown state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum TimerState {
    #[default]
    Idle,
    Pending {
        started_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
    },
    /// Fired for the current run; waits for the condition to clear
    Latched,
}

/// Debounce timer for one monitored condition
#[derive(Debug, Clone, Default)]
pub struct DebounceTimer {
    state: TimerState,
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the condition observed at `now`.
    ///
    /// Returns the time the condition has held when the timer fires, `None`
    /// otherwise. A false observation always cancels, even past the deadline.
    pub fn observe(&mut self, holds: bool, now: DateTime<Utc>, delay: Duration) -> Option<Duration> {
        if !holds {
            self.cancel();
            return None;
        }

        match self.state {
            TimerState::Idle => {
                self.state = TimerState::Pending {
                    started_at: now,
                    deadline: now + delay,
                };
                None
            }
            TimerState::Pending {
                started_at,
                deadline,
            } if now >= deadline => {
                self.state = TimerState::Latched;
                Some(now - started_at)
            }
            TimerState::Pending { .. } | TimerState::Latched => None,
        }
    }

    /// Drop any countdown without firing
    pub fn cancel(&mut self) {
        self.state = TimerState::Idle;
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, TimerState::Pending { .. })
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        match self.state {
            TimerState::Pending { deadline, .. } => Some(deadline),
            _ => None,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.state == TimerState::Latched
    }
}
