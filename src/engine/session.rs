//! CoachingSession: one athlete, one exercise, one pass per frame.
//!
//! The session owns all mutable pipeline state. Each call to
//! [`CoachingSession::on_frame`] runs
//! smoother → calibrator → metrics → rep counter → rules → feedback gate
//! and returns what the frame produced. Nothing here sleeps, spawns or
//! reads the clock; the caller supplies `now`.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::analysis::{FrameMetrics, KeypointSmoother, MetricExtractor, RepCounter, RepEvent};
use crate::calibration::{BaselineCalibrator, CalibrationStatus};
use crate::config::AppConfig;
use crate::feedback::{AlwaysReady, FeedbackGate, SpeechReadiness, SpeechRequest};
use crate::pose::PoseFrame;
use crate::rules::{self, ExerciseRuleSpec, RuleIssue};

pub const WAITING_FOR_BODY_MESSAGE: &str = "Step back so your whole body is visible";

/// What the athlete should see right now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    WaitingForBody,
    Calibrating { collected: usize, required: usize },
    Coaching { message: String },
}

impl SessionStatus {
    pub fn message(&self) -> String {
        match self {
            SessionStatus::WaitingForBody => WAITING_FOR_BODY_MESSAGE.to_string(),
            SessionStatus::Calibrating {
                collected,
                required,
            } => format!("Stand still - calibrating {}/{}", collected, required),
            SessionStatus::Coaching { message } => message.clone(),
        }
    }
}

/// Everything one frame produced
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEffects {
    pub status: SessionStatus,
    pub metrics: Option<FrameMetrics>,
    pub issues: Vec<RuleIssue>,
    pub rep_event: Option<RepEvent>,
    pub speech: Option<SpeechRequest>,
    /// Baseline frozen on this frame
    pub calibrated: Option<f64>,
}

impl FrameEffects {
    fn status_only(status: SessionStatus) -> Self {
        Self {
            status,
            metrics: None,
            issues: Vec::new(),
            rep_event: None,
            speech: None,
            calibrated: None,
        }
    }
}

/// Read-only view for status displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub metrics: Option<FrameMetrics>,
    pub issues: Vec<RuleIssue>,
    pub rep_count: u32,
    /// Frozen standing hip height, once calibration has finished
    #[serde(default)]
    pub baseline: Option<f64>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            status: SessionStatus::WaitingForBody,
            metrics: None,
            issues: Vec::new(),
            rep_count: 0,
            baseline: None,
        }
    }
}

/// Mutable per-session pipeline state
#[derive(Debug)]
pub struct SessionState {
    pub smoother: KeypointSmoother,
    pub calibrator: BaselineCalibrator,
    pub reps: RepCounter,
    pub gate: FeedbackGate,
}

impl SessionState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            smoother: KeypointSmoother::new(config.smoothing.window),
            calibrator: BaselineCalibrator::new(config.calibration.clone()),
            reps: RepCounter::new(config.reps.clone()),
            gate: FeedbackGate::new(config.feedback.clone()),
        }
    }
}

pub struct CoachingSession {
    config: AppConfig,
    spec: Arc<ExerciseRuleSpec>,
    extractor: MetricExtractor,
    state: SessionState,
    last: SessionSnapshot,
}

impl CoachingSession {
    pub fn new(config: AppConfig, spec: Arc<ExerciseRuleSpec>) -> Self {
        let extractor = MetricExtractor::new(config.pose.clone(), &config.reps);
        let state = SessionState::new(&config);
        Self {
            config,
            spec,
            extractor,
            state,
            last: SessionSnapshot::default(),
        }
    }

    pub fn spec(&self) -> &Arc<ExerciseRuleSpec> {
        &self.spec
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn rep_count(&self) -> u32 {
        self.state.reps.count()
    }

    pub fn calibration_status(&self) -> CalibrationStatus {
        self.state.calibrator.status()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.last.clone()
    }

    /// Process a frame with no speech path to consult
    pub fn on_frame(&mut self, frame: &PoseFrame, now: Instant) -> FrameEffects {
        self.on_frame_with(frame, now, &AlwaysReady)
    }

    pub fn on_frame_with(
        &mut self,
        frame: &PoseFrame,
        now: Instant,
        readiness: &dyn SpeechReadiness,
    ) -> FrameEffects {
        let effects = self.process(frame, now, readiness);
        self.last = SessionSnapshot {
            status: effects.status.clone(),
            metrics: effects.metrics.clone(),
            issues: effects.issues.clone(),
            rep_count: self.state.reps.count(),
            baseline: self.state.calibrator.baseline().ok(),
        };
        effects
    }

    /// Start over: recalibrate, zero the rep count, forget feedback history
    pub fn reset(&mut self) {
        self.state = SessionState::new(&self.config);
        self.last = SessionSnapshot::default();
    }

    fn process(
        &mut self,
        frame: &PoseFrame,
        now: Instant,
        readiness: &dyn SpeechReadiness,
    ) -> FrameEffects {
        let Some(body) = self.extractor.observe(frame) else {
            self.state.calibrator.interrupt();
            return FrameEffects::status_only(SessionStatus::WaitingForBody);
        };

        let smoothed_hip_y = self.state.smoother.push(body.hip.y);

        let was_calibrated = self.state.calibrator.is_calibrated();
        let baseline = match self.state.calibrator.observe(smoothed_hip_y) {
            CalibrationStatus::Calibrating {
                collected,
                required,
            } => {
                return FrameEffects::status_only(SessionStatus::Calibrating {
                    collected,
                    required,
                })
            }
            CalibrationStatus::Calibrated { baseline } => baseline,
        };
        let calibrated = (!was_calibrated).then_some(baseline);

        let mut metrics = self.extractor.compute(&body, smoothed_hip_y, baseline);

        // Low-confidence frames are judged by the rules but never counted
        let rep_event = if metrics.confidence >= self.spec.min_confidence {
            self.state.reps.update(&metrics, now)
        } else {
            None
        };
        metrics.rep_hip_drop = self.state.reps.last_descent_drop();

        let evaluation = rules::evaluate(&metrics, &self.spec);
        let decision = self.state.gate.evaluate(&evaluation, now, readiness);

        FrameEffects {
            status: SessionStatus::Coaching {
                message: decision.status_message,
            },
            metrics: Some(metrics),
            issues: evaluation.issues,
            rep_event,
            speech: decision.request,
            calibrated,
        }
    }
}

#[cfg(test)]
mod tests;
