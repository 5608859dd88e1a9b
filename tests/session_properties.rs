//! Integration tests for session behavior
//!
//! Tests the full path: frame signal → engine → closed session → report

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

use proctor_engine::config::{EngineConfig, GazeConfig};
use proctor_engine::scoring::ScoreBand;
use proctor_engine::types::{GazePoint, SessionStatus};
use proctor_engine::{
    ManualClock, ProctorError, ProctoringEngine, ReportBuilder, FrameSignal, ViolationKind,
};

fn engine() -> (ProctoringEngine<ManualClock>, ManualClock) {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap());
    let engine = ProctoringEngine::with_clock(EngineConfig::default(), clock.clone()).unwrap();
    (engine, clock)
}

fn looking_away() -> Vec<GazePoint> {
    let config = GazeConfig::default();
    let mut points = vec![GazePoint { x: 320.0, y: 240.0 }; config.right_eye_index + 1];
    points[config.left_eye_index] = GazePoint { x: 280.0, y: 220.0 };
    points[config.right_eye_index] = GazePoint { x: 360.0, y: 220.0 };
    points[config.nose_index] = GazePoint { x: 400.0, y: 250.0 };
    points
}

#[test]
fn test_start_then_end_is_clean() {
    for label in ["Alice", "Bob Smith", "  padded  "] {
        let (mut engine, _) = engine();
        engine.start(label).unwrap();
        let closed = engine.end().unwrap();

        assert_eq!(closed.session().status(), SessionStatus::Closed);
        assert!(closed.session().events().is_empty());
        assert_eq!(closed.session().integrity_score(), 100);
    }
}

#[test]
fn test_repeated_objects_floor_score_at_zero() {
    let (mut engine, clock) = engine();
    engine.start("Alice").unwrap();

    let frame = FrameSignal::single_face().with_object("cell phone", 0.92);
    for _ in 0..15 {
        clock.advance_secs(1);
        assert_eq!(engine.analyze_frame(&frame).len(), 1);
    }

    let closed = engine.end().unwrap();
    assert_eq!(closed.session().events().len(), 15);
    assert_eq!(closed.session().integrity_score(), 0);
}

#[test]
fn test_short_absence_yields_nothing() {
    let (mut engine, clock) = engine();
    engine.start("Alice").unwrap();

    for _ in 0..3 {
        engine.analyze_frame(&FrameSignal::with_faces(0));
        clock.advance_secs(4);
    }
    // Last absent frame was at +8s; the face returns at +12s.
    engine.analyze_frame(&FrameSignal::single_face());

    let closed = engine.end().unwrap();
    assert!(closed.session().events().is_empty());
    assert_eq!(closed.session().integrity_score(), 100);
}

#[test]
fn test_long_absence_yields_exactly_one_event() {
    let (mut engine, clock) = engine();
    engine.start("Alice").unwrap();

    for _ in 0..=30 {
        engine.analyze_frame(&FrameSignal::with_faces(0));
        clock.advance_secs(1);
    }

    let closed = engine.end().unwrap();
    let events = closed.session().events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ViolationKind::FaceMissing);
    assert_eq!(closed.session().integrity_score(), 90);
}

#[test]
fn test_multiple_faces_not_debounced() {
    let (mut engine, clock) = engine();
    engine.start("Alice").unwrap();

    for _ in 0..3 {
        engine.analyze_frame(&FrameSignal::with_faces(2));
        clock.advance_secs(1);
    }

    let counts = engine.event_counts();
    assert_eq!(counts.get(&ViolationKind::MultipleFaces), Some(&3));
    assert_eq!(engine.integrity_score(), 85);
}

#[test]
fn test_sustained_gaze_away() {
    let (mut engine, clock) = engine();
    engine.start("Alice").unwrap();

    let away = FrameSignal::single_face().with_keypoints(looking_away());
    for _ in 0..=6 {
        engine.analyze_frame(&away);
        clock.advance_secs(1);
    }

    let closed = engine.end().unwrap();
    let events = closed.session().events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ViolationKind::FocusLoss);
    assert_eq!(closed.session().integrity_score(), 95);
}

#[test]
fn test_report_is_idempotent() {
    let (mut engine, clock) = engine();
    engine.start("Alice").unwrap();
    engine.analyze_frame(&FrameSignal::with_faces(3).with_object("book", 0.7));
    clock.advance_secs(90);
    let closed = engine.end().unwrap();

    let first = ReportBuilder::build(&closed);
    let second = ReportBuilder::build(&closed);
    assert_eq!(first, second);
    assert_eq!(
        ReportBuilder::build_json(&closed).unwrap(),
        ReportBuilder::build_json(&closed).unwrap()
    );

    assert_eq!(first.duration_display, "01:30");
    assert_eq!(first.integrity_score, 85);
    assert_eq!(first.score_band, ScoreBand::Excellent);
}

#[test]
fn test_illegal_transitions() {
    let (mut engine, _) = engine();
    assert!(matches!(engine.end(), Err(ProctorError::NoActiveSession)));

    engine.start("Alice").unwrap();
    engine.analyze_frame(&FrameSignal::with_faces(2));
    let session_id = engine.current_session().unwrap().id();

    assert!(matches!(
        engine.start("Bob"),
        Err(ProctorError::SessionAlreadyActive)
    ));

    let session = engine.current_session().unwrap();
    assert_eq!(session.id(), session_id);
    assert_eq!(session.candidate_label(), "Alice");
    assert_eq!(session.events().len(), 1);
}

#[test]
fn test_empty_label_rejected() {
    let (mut engine, _) = engine();
    assert!(matches!(engine.start("   "), Err(ProctorError::InvalidInput(_))));
    assert!(!engine.is_active());
}

#[test]
fn test_score_is_monotonic() {
    let (mut engine, clock) = engine();
    engine.start("Alice").unwrap();

    let frames = [
        FrameSignal::with_faces(2),
        FrameSignal::single_face().with_object("laptop", 0.8),
        FrameSignal::with_faces(0),
        FrameSignal::single_face().with_keypoints(looking_away()),
        FrameSignal::with_faces(4).with_object("book", 0.6),
    ];

    let mut last = engine.integrity_score();
    for step in 0..200 {
        engine.analyze_frame(&frames[step % frames.len()]);
        clock.advance_secs(3);
        let score = engine.integrity_score();
        assert!(score <= last, "score rose from {} to {}", last, score);
        last = score;
    }

    let closed = engine.end().unwrap();
    let timeline = closed.session().score_timeline();
    assert_eq!(timeline.len(), closed.session().events().len());
    assert!(timeline.windows(2).all(|w| w[1].score_after <= w[0].score_after));
}

#[test]
fn test_frames_after_end_are_ignored() {
    let (mut engine, _) = engine();
    engine.start("Alice").unwrap();
    let closed = engine.end().unwrap();

    assert!(engine.analyze_frame(&FrameSignal::with_faces(2)).is_empty());
    assert!(closed.session().events().is_empty());
    assert_eq!(engine.integrity_score(), 100);
}
