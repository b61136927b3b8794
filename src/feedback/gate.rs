//! Feedback Gate - decides whether and what to say each frame
//!
//! The gate balances responsiveness against nagging. For the top-priority
//! issue it enforces, in order:
//! 1. patience: the issue has been visible long enough to not be a blip
//! 2. per-issue cooldown since it was last said
//! 3. a repeat cap per issue until form has been good for a while
//! 4. a global gap between any two utterances, unless the request is forced
//! 5. speech readiness: nothing in flight, no provider backoff
//!
//! Bookkeeping is only committed when a request is actually emitted, so a
//! request withheld by readiness is retried naturally on a later frame.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::state::FeedbackState;
use crate::config::FeedbackConfig;
use crate::rules::{RuleEvaluation, RuleIssue};

pub const GOOD_FORM_MESSAGE: &str = "Good form";

/// Whether the speech path can take a request right now
pub trait SpeechReadiness {
    fn is_ready(&self, text: &str, now: Instant) -> bool;
}

/// Readiness for sessions without a speech provider
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysReady;

impl SpeechReadiness for AlwaysReady {
    fn is_ready(&self, _text: &str, _now: Instant) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    pub issue_id: String,
    /// Bypasses the global gap
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    /// Always mirrors the top-priority issue, spoken or not
    pub status_message: String,
    pub top_issue: Option<RuleIssue>,
    pub request: Option<SpeechRequest>,
}

#[derive(Debug)]
pub struct FeedbackGate {
    config: FeedbackConfig,
    state: FeedbackState,
}

impl FeedbackGate {
    pub fn new(config: FeedbackConfig) -> Self {
        Self {
            config,
            state: FeedbackState::default(),
        }
    }

    pub fn state(&self) -> &FeedbackState {
        &self.state
    }

    pub fn evaluate(
        &mut self,
        evaluation: &RuleEvaluation,
        now: Instant,
        readiness: &dyn SpeechReadiness,
    ) -> GateDecision {
        let Some(top) = evaluation.top_issue() else {
            self.on_good_form(now);
            return GateDecision {
                status_message: GOOD_FORM_MESSAGE.to_string(),
                top_issue: None,
                request: None,
            };
        };

        self.state.good_form_since = None;
        let issue = self.state.observe(&top.rule_id, now);

        let patient = now.saturating_duration_since(issue.first_seen_at) >= self.config.patience();
        let cooled = issue
            .last_spoken_at
            .map_or(true, |at| now.saturating_duration_since(at) >= self.config.issue_cooldown());
        let under_cap = issue.spoken_count < self.config.max_repeats_per_issue;

        let mut request = None;
        if patient && cooled && under_cap {
            let forced = self.is_forced(&top.rule_id, evaluation);
            let gap_ok = forced
                || self.state.last_global_speak_at.map_or(true, |at| {
                    now.saturating_duration_since(at) >= self.config.global_gap()
                });

            if gap_ok && readiness.is_ready(&top.message, now) {
                self.state.record_spoken(&top.rule_id, now);
                log::info!(
                    "[Feedback] Speaking '{}' for {} (count {}, forced={})",
                    top.message,
                    top.rule_id,
                    issue.spoken_count + 1,
                    forced
                );
                request = Some(SpeechRequest {
                    text: top.message.clone(),
                    issue_id: top.rule_id.clone(),
                    forced,
                });
            }
        }

        GateDecision {
            status_message: top.message.clone(),
            top_issue: Some(top.clone()),
            request,
        }
    }

    pub fn reset(&mut self) {
        self.state = FeedbackState::default();
    }

    /// A different issue right after the previously spoken one resolved
    fn is_forced(&self, issue_id: &str, evaluation: &RuleEvaluation) -> bool {
        match &self.state.last_spoken_issue {
            Some(previous) => {
                previous != issue_id && !evaluation.issues.iter().any(|i| &i.rule_id == previous)
            }
            None => false,
        }
    }

    fn on_good_form(&mut self, now: Instant) {
        let since = *self.state.good_form_since.get_or_insert(now);
        if !self.state.issues.is_empty()
            && now.saturating_duration_since(since) >= self.config.good_form_reset()
        {
            log::debug!(
                "[Feedback] Sustained good form, clearing {} issue(s)",
                self.state.issues.len()
            );
            self.state.clear_issues();
        }
    }
}
