use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::recording::PoseRecording;
use crate::config::AppConfig;
use crate::engine::{CoachingSession, ManualTimeSource, SessionStatus, TimeSource};
use crate::rules::ExerciseRuleSpec;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayRep {
    pub t_ms: u64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayCue {
    pub t_ms: u64,
    pub text: String,
    pub issue_id: String,
    pub forced: bool,
}

/// Everything a recording produced when run through a fresh session
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub recording: String,
    pub exercise: String,
    pub frames: usize,
    pub baseline: Option<f64>,
    pub calibrated_at_ms: Option<u64>,
    pub rep_count: u32,
    pub reps: Vec<ReplayRep>,
    pub cues: Vec<ReplayCue>,
    /// Number of coached frames on which each issue was active
    pub issue_frames: BTreeMap<String, usize>,
    pub final_status: SessionStatus,
}

impl ReplayReport {
    pub fn cue_count(&self, issue_id: &str) -> usize {
        self.cues.iter().filter(|cue| cue.issue_id == issue_id).count()
    }
}

/// Run a recording through a new session on a hand-driven clock.
///
/// Frame timestamps drive the clock, so the result is the same on every run
/// regardless of wall time. Every gate-approved cue is treated as spoken.
pub fn replay(
    recording: &PoseRecording,
    config: &AppConfig,
    spec: Arc<ExerciseRuleSpec>,
) -> ReplayReport {
    let exercise = spec.exercise.clone();
    let mut session = CoachingSession::new(config.clone(), spec);
    let clock = ManualTimeSource::new();

    let mut report = ReplayReport {
        recording: recording.name.clone(),
        exercise,
        frames: recording.frames.len(),
        baseline: None,
        calibrated_at_ms: None,
        rep_count: 0,
        reps: Vec::new(),
        cues: Vec::new(),
        issue_frames: BTreeMap::new(),
        final_status: SessionStatus::WaitingForBody,
    };

    for (index, frame) in recording.frames.iter().enumerate() {
        let t_ms = recording.timestamp_ms(index);
        clock.set_elapsed(Duration::from_millis(t_ms));

        let effects = session.on_frame(frame, clock.now());

        if let Some(baseline) = effects.calibrated {
            report.baseline = Some(baseline);
            report.calibrated_at_ms = Some(t_ms);
        }
        if let Some(rep) = effects.rep_event {
            report.reps.push(ReplayRep {
                t_ms,
                count: rep.count,
            });
        }
        if let Some(request) = effects.speech {
            report.cues.push(ReplayCue {
                t_ms,
                text: request.text,
                issue_id: request.issue_id,
                forced: request.forced,
            });
        }
        for issue in &effects.issues {
            *report.issue_frames.entry(issue.rule_id.clone()).or_default() += 1;
        }
        report.final_status = effects.status;
    }

    report.rep_count = session.rep_count();
    log::debug!(
        "Replayed '{}': {} frames, {} reps, {} cues",
        report.recording,
        report.frames,
        report.rep_count,
        report.cues.len()
    );
    report
}
