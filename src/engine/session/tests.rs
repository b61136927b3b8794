use std::sync::Arc;
use std::time::{Duration, Instant};

use super::*;
use crate::fixtures::side_view_frame;
use crate::rules::CONFIDENCE_ISSUE_ID;

const FRAME_MS: u64 = 100;

struct Harness {
    session: CoachingSession,
    start: Instant,
    frames: u64,
}

impl Harness {
    fn new() -> Self {
        Self {
            session: CoachingSession::new(
                AppConfig::default(),
                Arc::new(ExerciseRuleSpec::builtin("squat")),
            ),
            start: Instant::now(),
            frames: 0,
        }
    }

    fn step(&mut self, frame: &PoseFrame) -> FrameEffects {
        let now = self.start + Duration::from_millis(self.frames * FRAME_MS);
        self.frames += 1;
        self.session.on_frame(frame, now)
    }

    fn hip(&mut self, hip_y: f64) -> FrameEffects {
        self.step(&side_view_frame(hip_y, 0.0, 0.9))
    }

    fn calibrate(&mut self) {
        for _ in 0..40 {
            self.hip(300.0);
        }
        assert!(self.session.calibration_status().is_calibrated());
    }

    /// Down to `bottom` in 7 px steps, hold, back up, hold standing
    fn squat(&mut self, bottom: f64, confidence: f64) -> Vec<FrameEffects> {
        let mut path = Vec::new();
        let mut y = 300.0;
        while y < bottom {
            y = (y + 7.0).min(bottom);
            path.push(y);
        }
        path.extend(std::iter::repeat(bottom).take(10));
        while y > 300.0 {
            y = (y - 7.0).max(300.0);
            path.push(y);
        }
        path.extend(std::iter::repeat(300.0).take(10));

        path.into_iter()
            .map(|hip_y| self.step(&side_view_frame(hip_y, 0.0, confidence)))
            .collect()
    }
}

fn empty_frame() -> PoseFrame {
    PoseFrame::new(Vec::new(), 640.0, 480.0)
}

#[test]
fn test_no_body_waits() {
    let mut h = Harness::new();
    let effects = h.step(&empty_frame());

    assert_eq!(effects.status, SessionStatus::WaitingForBody);
    assert_eq!(effects.status.message(), WAITING_FOR_BODY_MESSAGE);
    assert!(effects.metrics.is_none());
    assert!(effects.speech.is_none());
}

#[test]
fn test_calibration_counts_up_then_coaches() {
    let mut h = Harness::new();

    for i in 1..40 {
        let effects = h.hip(300.0);
        assert_eq!(
            effects.status,
            SessionStatus::Calibrating {
                collected: i,
                required: 40
            }
        );
        assert!(effects.metrics.is_none());
    }

    let effects = h.hip(300.0);
    assert_eq!(effects.calibrated, Some(300.0));
    assert!(matches!(effects.status, SessionStatus::Coaching { .. }));
    assert!(effects.metrics.is_some());

    // Baseline is reported only once
    assert_eq!(h.hip(300.0).calibrated, None);
}

#[test]
fn test_losing_the_body_restarts_calibration() {
    let mut h = Harness::new();
    for _ in 0..20 {
        h.hip(300.0);
    }

    assert_eq!(h.step(&empty_frame()).status, SessionStatus::WaitingForBody);
    assert_eq!(
        h.hip(300.0).status,
        SessionStatus::Calibrating {
            collected: 1,
            required: 40
        }
    );
}

#[test]
fn test_snapshot_keeps_baseline_while_body_is_lost() {
    let mut h = Harness::new();
    h.hip(300.0);
    assert_eq!(h.session.snapshot().baseline, None);

    h.calibrate();
    assert_eq!(h.session.snapshot().baseline, Some(300.0));

    h.step(&empty_frame());
    let snapshot = h.session.snapshot();
    assert_eq!(snapshot.status, SessionStatus::WaitingForBody);
    assert_eq!(snapshot.baseline, Some(300.0));
}

#[test]
fn test_full_squat_counts_one_rep() {
    let mut h = Harness::new();
    h.calibrate();

    let effects = h.squat(370.0, 0.9);
    let reps: Vec<_> = effects.iter().filter_map(|e| e.rep_event).collect();

    assert_eq!(reps, vec![RepEvent { count: 1 }]);
    assert_eq!(h.session.rep_count(), 1);
    assert_eq!(h.session.snapshot().rep_count, 1);

    // 70 px of travel over a 100 px hip-to-knee span clears the depth rule
    let last = effects.last().unwrap();
    assert!(last.issues.is_empty());
    assert_eq!(last.status.message(), "Good form");
}

#[test]
fn test_shallow_squat_is_not_counted_and_flags_depth() {
    let mut h = Harness::new();
    h.calibrate();

    let effects = h.squat(325.0, 0.9);
    assert!(effects.iter().all(|e| e.rep_event.is_none()));
    assert_eq!(h.session.rep_count(), 0);

    let last = effects.last().unwrap();
    let depth = last.issues.iter().find(|i| i.rule_id == "depth").unwrap();
    assert_eq!(depth.message, "Squat a little deeper");
    assert_eq!(last.status.message(), "Squat a little deeper");

    // Still flagged while standing; spoken once patience runs out
    let spoken: Vec<_> = (0..20).filter_map(|_| h.hip(300.0).speech).collect();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].issue_id, "depth");
}

#[test]
fn test_forward_lean_is_spoken_after_patience() {
    let mut h = Harness::new();
    h.calibrate();

    let mut first_spoken = None;
    for k in 0..20 {
        let effects = h.step(&side_view_frame(300.0, 40.0, 0.9));
        assert_eq!(effects.status.message(), "Keep your chest up");
        if let Some(request) = effects.speech {
            first_spoken.get_or_insert((k, request));
        }
    }

    let (k, request) = first_spoken.unwrap();
    assert_eq!(k, 15);
    assert_eq!(request.text, "Keep your chest up");
    assert_eq!(request.issue_id, "torso_lean");
    assert!(!request.forced);
}

#[test]
fn test_low_confidence_flags_and_skips_reps() {
    let mut h = Harness::new();
    h.calibrate();

    let effects = h.squat(370.0, 0.4);
    assert!(effects.iter().all(|e| e.rep_event.is_none()));
    assert_eq!(h.session.rep_count(), 0);

    let last = effects.last().unwrap();
    assert_eq!(last.issues.len(), 1);
    assert_eq!(last.issues[0].rule_id, CONFIDENCE_ISSUE_ID);
}

#[test]
fn test_reset_starts_over() {
    let mut h = Harness::new();
    h.calibrate();
    h.squat(370.0, 0.9);
    assert_eq!(h.session.rep_count(), 1);

    h.session.reset();
    assert_eq!(h.session.rep_count(), 0);
    assert_eq!(h.session.snapshot(), SessionSnapshot::default());
    assert_eq!(
        h.hip(300.0).status,
        SessionStatus::Calibrating {
            collected: 1,
            required: 40
        }
    );
}
