// Feedback bookkeeping - per-issue timers and session-wide throttles
//
// Each issue moves Unseen -> Seen(first_seen_at) -> Spoken(last_spoken_at,
// count). Entries are created lazily and wiped together after sustained
// good form.

use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueFeedbackState {
    pub first_seen_at: Instant,
    pub last_spoken_at: Option<Instant>,
    pub spoken_count: u32,
}

impl IssueFeedbackState {
    pub fn seen(now: Instant) -> Self {
        Self {
            first_seen_at: now,
            last_spoken_at: None,
            spoken_count: 0,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct FeedbackState {
    pub issues: HashMap<String, IssueFeedbackState>,
    pub good_form_since: Option<Instant>,
    pub last_global_speak_at: Option<Instant>,
    pub last_spoken_issue: Option<String>,
}

impl FeedbackState {
    /// Entry for `issue_id`, recording first-seen on first observation
    pub fn observe(&mut self, issue_id: &str, now: Instant) -> IssueFeedbackState {
        *self
            .issues
            .entry(issue_id.to_string())
            .or_insert_with(|| IssueFeedbackState::seen(now))
    }

    pub fn record_spoken(&mut self, issue_id: &str, now: Instant) {
        let entry = self
            .issues
            .entry(issue_id.to_string())
            .or_insert_with(|| IssueFeedbackState::seen(now));
        entry.last_spoken_at = Some(now);
        entry.spoken_count += 1;
        self.last_global_speak_at = Some(now);
        self.last_spoken_issue = Some(issue_id.to_string());
    }

    /// Forget every issue's timers and counts
    pub fn clear_issues(&mut self) {
        self.issues.clear();
    }
}
