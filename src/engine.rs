//! Proctoring session engine
//!
//! Owns at most one session at a time and turns the stream of per-frame signals into
//! violation events. The driver calls [`ProctoringEngine::analyze_frame`] serially at
//! a fixed cadence; all timer bookkeeping happens inside that call, against the
//! engine's clock.
//!
//! Per frame, detection runs in a fixed order:
//! 1. face presence (debounced face-missing)
//! 2. multiple faces (every qualifying frame)
//! 3. gaze, only with exactly one face and keypoints present (debounced focus-loss)
//! 4. disallowed objects (one event per matching detection)

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::debounce::DebounceTimer;
use crate::error::{PerceptionError, ProctorError};
use crate::gaze;
use crate::report;
use crate::scoring::INITIAL_SCORE;
use crate::status::{LiveStatus, SessionHandle};
use crate::types::{
    ClosedSession, EventDetails, FrameSignal, Recording, Session, Severity, ViolationEvent,
    ViolationKind,
};

/// Session state machine: `Idle` when `session` is `None`, `Active` otherwise
pub struct ProctoringEngine<C: Clock = SystemClock> {
    config: EngineConfig,
    clock: C,
    session: Option<Session>,
    face_timer: DebounceTimer,
    gaze_timer: DebounceTimer,
}

impl Default for ProctoringEngine<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl ProctoringEngine<SystemClock> {
    /// Create an engine with default settings and the system clock
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            clock: SystemClock,
            session: None,
            face_timer: DebounceTimer::new(),
            gaze_timer: DebounceTimer::new(),
        }
    }

    /// Create an engine with a custom configuration and the system clock
    pub fn with_config(config: EngineConfig) -> Result<Self, ProctorError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> ProctoringEngine<C> {
    /// Create an engine with a custom configuration and time source
    pub fn with_clock(config: EngineConfig, clock: C) -> Result<Self, ProctorError> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            session: None,
            face_timer: DebounceTimer::new(),
            gaze_timer: DebounceTimer::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Begin a session for `candidate_label`.
    ///
    /// Fails with `InvalidInput` for a blank label and `SessionAlreadyActive` when a
    /// session is running; in both cases the engine is left untouched.
    pub fn start(&mut self, candidate_label: &str) -> Result<&Session, ProctorError> {
        let label = candidate_label.trim();
        if label.is_empty() {
            return Err(ProctorError::InvalidInput(
                "candidate label must not be empty".to_string(),
            ));
        }
        if self.session.is_some() {
            return Err(ProctorError::SessionAlreadyActive);
        }

        self.face_timer.cancel();
        self.gaze_timer.cancel();

        let mut session = Session::new(label.to_string(), self.clock.now());
        session.activate();
        info!(
            "proctoring session {} started for '{}'",
            session.id(),
            session.candidate_label()
        );

        Ok(&*self.session.insert(session))
    }

    /// Process one frame's signal and return the events it produced.
    ///
    /// Outside a session this is a no-op: the driving loop may race session
    /// boundaries.
    pub fn analyze_frame(&mut self, signal: &FrameSignal) -> Vec<ViolationEvent> {
        let now = self.clock.now();
        let Some(session) = self.session.as_mut() else {
            debug!("frame analysis ignored: no active session");
            return Vec::new();
        };

        let mut detected: Vec<EventDetails> = Vec::new();

        // Face presence: any visible face restores presence and cancels the countdown
        let was_pending = self.face_timer.is_pending();
        if let Some(elapsed) =
            self.face_timer
                .observe(signal.face_count == 0, now, self.config.face_absence_delay())
        {
            detected.push(EventDetails::FaceMissing {
                elapsed_secs: report::duration_secs(elapsed),
                threshold_secs: self.config.face_absence_secs,
            });
        } else if !was_pending && self.face_timer.is_pending() {
            debug!("face absent, countdown armed");
        }

        if signal.face_count > 1 {
            detected.push(EventDetails::MultipleFaces {
                face_count: signal.face_count,
            });
        }

        if signal.face_count == 1 {
            if let Some(keypoints) = signal.gaze_keypoints.as_deref() {
                let away = gaze::is_looking_away(keypoints, &self.config.gaze);
                if let Some(elapsed) =
                    self.gaze_timer
                        .observe(away, now, self.config.gaze_away_delay())
                {
                    detected.push(EventDetails::FocusLoss {
                        elapsed_secs: report::duration_secs(elapsed),
                        threshold_secs: self.config.gaze_away_secs,
                    });
                }
            }
        }

        for object in &signal.detected_objects {
            if self.config.is_disallowed(&object.label) {
                detected.push(EventDetails::UnauthorizedObject {
                    label: object.label.clone(),
                    confidence: object.confidence,
                });
            }
        }

        let mut emitted = Vec::with_capacity(detected.len());
        for details in detected {
            let event = ViolationEvent::new(details, now);
            if event.severity == Severity::High {
                warn!("{} ({})", event.description, event.kind.as_str());
            } else {
                debug!("{} ({})", event.description, event.kind.as_str());
            }
            session.record(event.clone());
            emitted.push(event);
        }

        emitted
    }

    /// Process one tick's perception outcome.
    ///
    /// A failed inference yields no signal for the tick; timers and ledger are
    /// left exactly as they were.
    pub fn analyze_outcome(
        &mut self,
        outcome: Result<FrameSignal, PerceptionError>,
    ) -> Vec<ViolationEvent> {
        match outcome {
            Ok(signal) => self.analyze_frame(&signal),
            Err(e) => {
                warn!("skipping frame: {e}");
                Vec::new()
            }
        }
    }

    /// Close the active session and hand it to the caller.
    ///
    /// Pending timers are discarded without firing.
    pub fn end(&mut self) -> Result<ClosedSession, ProctorError> {
        let session = self.session.take().ok_or(ProctorError::NoActiveSession)?;

        self.face_timer.cancel();
        self.gaze_timer.cancel();

        let closed = session.close(self.clock.now());
        info!(
            "proctoring session {} ended: score {}, {} events",
            closed.session().id(),
            closed.session().integrity_score(),
            closed.session().events().len()
        );
        Ok(closed)
    }

    /// Close the active session and reference the recorded media in it
    pub fn end_with_recording(&mut self, recording: &Recording) -> Result<ClosedSession, ProctorError> {
        let closed = self.end()?;
        let metadata = report::recording_metadata(
            recording,
            closed.session().candidate_label(),
            closed.ended_at(),
        );
        Ok(closed.with_recording(metadata))
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Live score; 100 when no session is active
    pub fn integrity_score(&self) -> u8 {
        self.session
            .as_ref()
            .map(Session::integrity_score)
            .unwrap_or(INITIAL_SCORE)
    }

    /// Running count per kind; empty when no session is active
    pub fn event_counts(&self) -> BTreeMap<ViolationKind, usize> {
        self.session
            .as_ref()
            .map(|s| s.ledger().counts_by_kind())
            .unwrap_or_default()
    }

    pub fn handle(&self) -> Option<SessionHandle> {
        let session = self.session.as_ref()?;
        Some(SessionHandle::from_session(session, self.clock.now()))
    }

    pub fn live_status(&self) -> Option<LiveStatus> {
        let session = self.session.as_ref()?;
        let since = self.clock.now() - self.config.status_window();
        Some(LiveStatus::from_ledger(session.ledger(), since))
    }

    pub fn face_timer_pending(&self) -> bool {
        self.face_timer.is_pending()
    }

    pub fn gaze_timer_pending(&self) -> bool {
        self.gaze_timer.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::gaze::tests::keypoints_with_nose_offset;
    use crate::status::{FaceStatus, ObjectStatus};
    use crate::types::SessionStatus;
    use chrono::{TimeZone, Utc};

    fn engine() -> (ProctoringEngine<ManualClock>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap());
        let engine = ProctoringEngine::with_clock(EngineConfig::default(), clock.clone()).unwrap();
        (engine, clock)
    }

    fn looking_away() -> FrameSignal {
        FrameSignal::single_face().with_keypoints(keypoints_with_nose_offset(120.0))
    }

    fn looking_at_screen() -> FrameSignal {
        FrameSignal::single_face().with_keypoints(keypoints_with_nose_offset(0.0))
    }

    #[test]
    fn test_start_rejects_blank_label() {
        let (mut engine, _) = engine();
        assert!(matches!(engine.start(""), Err(ProctorError::InvalidInput(_))));
        assert!(matches!(engine.start("   \t"), Err(ProctorError::InvalidInput(_))));
        assert!(!engine.is_active());
    }

    #[test]
    fn test_start_trims_label_and_activates() {
        let (mut engine, _) = engine();
        let session = engine.start("  Alice ").unwrap();
        assert_eq!(session.candidate_label(), "Alice");
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.integrity_score(), 100);
        assert!(session.events().is_empty());
    }

    #[test]
    fn test_second_start_fails_and_keeps_session() {
        let (mut engine, _) = engine();
        let first_id = engine.start("Alice").unwrap().id();
        engine.analyze_frame(&FrameSignal::with_faces(2));

        assert!(matches!(engine.start("Bob"), Err(ProctorError::SessionAlreadyActive)));

        let session = engine.current_session().unwrap();
        assert_eq!(session.id(), first_id);
        assert_eq!(session.candidate_label(), "Alice");
        assert_eq!(session.events().len(), 1);
    }

    #[test]
    fn test_end_without_session_fails() {
        let (mut engine, _) = engine();
        assert!(matches!(engine.end(), Err(ProctorError::NoActiveSession)));
    }

    #[test]
    fn test_analyze_without_session_is_noop() {
        let (mut engine, _) = engine();
        let events = engine.analyze_frame(&FrameSignal::with_faces(3).with_object("book", 0.9));
        assert!(events.is_empty());
        assert_eq!(engine.integrity_score(), 100);
        assert!(engine.event_counts().is_empty());
    }

    #[test]
    fn test_end_closes_and_returns_ownership() {
        let (mut engine, clock) = engine();
        engine.start("Alice").unwrap();
        clock.advance_secs(90);

        let closed = engine.end().unwrap();
        assert_eq!(closed.session().status(), SessionStatus::Closed);
        assert_eq!(closed.duration().num_seconds(), 90);
        assert!(!engine.is_active());
        assert!(engine.current_session().is_none());
    }

    #[test]
    fn test_face_missing_debounce() {
        let (mut engine, clock) = engine();
        engine.start("Alice").unwrap();

        let mut total = Vec::new();
        for _ in 0..=25 {
            total.extend(engine.analyze_frame(&FrameSignal::with_faces(0)));
            clock.advance_secs(1);
        }

        assert_eq!(total.len(), 1);
        assert_eq!(total[0].kind, ViolationKind::FaceMissing);
        assert_eq!(total[0].severity, Severity::High);
        assert_eq!(
            total[0].details,
            EventDetails::FaceMissing {
                elapsed_secs: 10.0,
                threshold_secs: 10
            }
        );
        assert_eq!(total[0].description, "No face detected for more than 10 seconds");
        assert_eq!(engine.integrity_score(), 90);
    }

    #[test]
    fn test_face_returning_cancels_countdown() {
        let (mut engine, clock) = engine();
        engine.start("Alice").unwrap();

        for _ in 0..3 {
            assert!(engine.analyze_frame(&FrameSignal::with_faces(0)).is_empty());
            clock.advance_secs(4);
        }
        assert!(engine.face_timer_pending());

        assert!(engine.analyze_frame(&FrameSignal::single_face()).is_empty());
        assert!(!engine.face_timer_pending());

        let closed = engine.end().unwrap();
        assert!(closed.session().events().is_empty());
        assert_eq!(closed.session().integrity_score(), 100);
    }

    #[test]
    fn test_multiple_faces_every_frame() {
        let (mut engine, clock) = engine();
        engine.start("Alice").unwrap();

        for _ in 0..3 {
            let events = engine.analyze_frame(&FrameSignal::with_faces(2));
            assert_eq!(events.len(), 1);
            assert_eq!(
                events[0].details,
                EventDetails::MultipleFaces { face_count: 2 }
            );
            clock.advance_secs(1);
        }
        assert_eq!(engine.integrity_score(), 85);
        assert_eq!(engine.event_counts().get(&ViolationKind::MultipleFaces), Some(&3));
    }

    #[test]
    fn test_focus_loss_debounce() {
        let (mut engine, clock) = engine();
        engine.start("Alice").unwrap();

        let mut events = Vec::new();
        for _ in 0..5 {
            events.extend(engine.analyze_frame(&looking_away()));
            clock.advance_secs(1);
        }
        assert!(events.is_empty());
        assert!(engine.gaze_timer_pending());

        events.extend(engine.analyze_frame(&looking_away()));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ViolationKind::FocusLoss);
        assert_eq!(events[0].severity, Severity::Medium);
        assert_eq!(engine.integrity_score(), 95);
    }

    #[test]
    fn test_looking_back_cancels_focus_countdown() {
        let (mut engine, clock) = engine();
        engine.start("Alice").unwrap();

        for _ in 0..4 {
            engine.analyze_frame(&looking_away());
            clock.advance_secs(1);
        }
        engine.analyze_frame(&looking_at_screen());
        assert!(!engine.gaze_timer_pending());

        for _ in 0..4 {
            assert!(engine.analyze_frame(&looking_away()).is_empty());
            clock.advance_secs(1);
        }
    }

    #[test]
    fn test_gaze_ignored_with_multiple_faces() {
        let (mut engine, clock) = engine();
        engine.start("Alice").unwrap();

        let mut signal = looking_away();
        signal.face_count = 2;
        for _ in 0..10 {
            let events = engine.analyze_frame(&signal);
            assert!(events.iter().all(|e| e.kind == ViolationKind::MultipleFaces));
            clock.advance_secs(1);
        }
        assert!(!engine.gaze_timer_pending());
    }

    #[test]
    fn test_unauthorized_objects_per_detection() {
        let (mut engine, _) = engine();
        engine.start("Alice").unwrap();

        let signal = FrameSignal::single_face()
            .with_object("Cell Phone", 0.91)
            .with_object("cup", 0.88)
            .with_object("book", 0.67);
        let events = engine.analyze_frame(&signal);

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].details,
            EventDetails::UnauthorizedObject {
                label: "Cell Phone".to_string(),
                confidence: 0.91
            }
        );
        assert_eq!(events[1].description, "Detected book in frame");
        assert_eq!(engine.integrity_score(), 80);
    }

    #[test]
    fn test_event_order_within_frame() {
        let (mut engine, clock) = engine();
        engine.start("Alice").unwrap();

        engine.analyze_frame(&FrameSignal::with_faces(0));
        clock.advance_secs(10);
        let events = engine.analyze_frame(&FrameSignal::with_faces(0).with_object("laptop", 0.7));
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![ViolationKind::FaceMissing, ViolationKind::UnauthorizedObject]
        );

        let timeline = engine.current_session().unwrap().score_timeline();
        let scores: Vec<_> = timeline.iter().map(|s| s.score_after).collect();
        assert_eq!(scores, vec![90, 80]);
    }

    #[test]
    fn test_end_discards_pending_timers() {
        let (mut engine, clock) = engine();
        engine.start("Alice").unwrap();
        engine.analyze_frame(&FrameSignal::with_faces(0));
        clock.advance_secs(9);
        engine.analyze_frame(&FrameSignal::with_faces(0));

        let closed = engine.end().unwrap();
        assert!(closed.session().events().is_empty());
        assert!(!engine.face_timer_pending());
    }

    #[test]
    fn test_restart_resets_timers_and_ledger() {
        let (mut engine, clock) = engine();
        engine.start("Alice").unwrap();
        engine.analyze_frame(&FrameSignal::with_faces(2));
        engine.analyze_frame(&FrameSignal::with_faces(0));
        engine.end().unwrap();

        engine.start("Bob").unwrap();
        clock.advance_secs(10);
        // A countdown from Alice's session must not carry over
        assert!(engine.analyze_frame(&FrameSignal::with_faces(0)).is_empty());
        assert_eq!(engine.integrity_score(), 100);
        assert!(engine.event_counts().is_empty());
    }

    #[test]
    fn test_perception_failure_keeps_state() {
        let (mut engine, clock) = engine();
        engine.start("Alice").unwrap();
        engine.analyze_frame(&FrameSignal::with_faces(2));
        engine.analyze_frame(&FrameSignal::with_faces(0));
        clock.advance_secs(3);

        let events = engine.analyze_outcome(Err(PerceptionError::new("detector crashed")));
        assert!(events.is_empty());
        assert!(engine.face_timer_pending());
        assert_eq!(engine.current_session().unwrap().events().len(), 1);
        assert_eq!(engine.integrity_score(), 95);
    }

    #[test]
    fn test_handle_and_live_status() {
        let (mut engine, clock) = engine();
        assert!(engine.handle().is_none());

        engine.start("Alice").unwrap();
        clock.advance_secs(30);
        engine.analyze_frame(&FrameSignal::with_faces(2).with_object("book", 0.8));

        let handle = engine.handle().unwrap();
        assert_eq!(handle.elapsed_secs, 30);
        assert_eq!(handle.integrity_score, 85);
        assert_eq!(handle.event_counts.len(), 2);

        let status = engine.live_status().unwrap();
        assert_eq!(status.face, FaceStatus::MultipleFaces);
        assert_eq!(
            status.objects,
            ObjectStatus::Detected {
                label: "book".to_string()
            }
        );

        clock.advance_secs(11);
        let status = engine.live_status().unwrap();
        assert_eq!(status.face, FaceStatus::FaceDetected);
        assert_eq!(status.objects, ObjectStatus::Clear);
    }

    #[test]
    fn test_end_with_recording_attaches_metadata() {
        let (mut engine, _) = engine();
        engine.start("Alice").unwrap();

        let recording = Recording {
            bytes: b"not really a webm".to_vec(),
            mime_type: "video/webm".to_string(),
        };
        let closed = engine.end_with_recording(&recording).unwrap();
        let metadata = closed.recording().unwrap();

        assert_eq!(metadata.size_bytes, 17);
        assert_eq!(metadata.mime_type, "video/webm");
        assert_eq!(metadata.sha256.len(), 64);
        assert_eq!(metadata.file_name, "interview-recording-Alice-2024-01-15.webm");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            gaze_away_secs: 0,
            ..Default::default()
        };
        assert!(ProctoringEngine::with_clock(config, ManualClock::default()).is_err());
    }
}
