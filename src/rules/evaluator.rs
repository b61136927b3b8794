//! Rule Evaluator - applies an exercise rule spec to one frame's metrics

use serde::{Deserialize, Serialize};

use super::spec::{ExerciseRuleSpec, RuleDefinition, RuleKind, Severity};
use crate::analysis::FrameMetrics;

/// Issue id reported when the frame is too uncertain to judge
pub const CONFIDENCE_ISSUE_ID: &str = "confidence";

const LOW_CONFIDENCE_MESSAGE: &str = "Low confidence - step into view";
const PASS_MESSAGE: &str = "Looks good";
const BELOW_MIN_MESSAGE: &str = "Value below min";
const ABOVE_MAX_MESSAGE: &str = "Value above max";
const RATIO_BELOW_MIN_MESSAGE: &str = "Ratio below min";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    /// Measured value, when the rule could be judged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

/// A non-passing result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleIssue {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    /// False iff at least one `fail` issue exists
    pub valid: bool,
    pub results: Vec<RuleResult>,
    /// Declaration order
    pub issues: Vec<RuleIssue>,
}

impl RuleEvaluation {
    /// Highest-severity issue; ties go to the earliest declared
    pub fn top_issue(&self) -> Option<&RuleIssue> {
        self.issues.iter().fold(None, |best, issue| match best {
            Some(current) if current.severity >= issue.severity => Some(current),
            _ => Some(issue),
        })
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Evaluate every rule of `spec` against `metrics`
pub fn evaluate(metrics: &FrameMetrics, spec: &ExerciseRuleSpec) -> RuleEvaluation {
    if metrics.confidence < spec.min_confidence {
        let message = spec
            .message(CONFIDENCE_ISSUE_ID, Severity::Fail)
            .unwrap_or(LOW_CONFIDENCE_MESSAGE)
            .to_string();
        return RuleEvaluation {
            valid: false,
            results: vec![RuleResult {
                rule_id: CONFIDENCE_ISSUE_ID.to_string(),
                severity: Severity::Fail,
                message: message.clone(),
                value: Some(metrics.confidence),
            }],
            issues: vec![RuleIssue {
                rule_id: CONFIDENCE_ISSUE_ID.to_string(),
                severity: Severity::Fail,
                message,
            }],
        };
    }

    let results: Vec<RuleResult> = spec
        .rules
        .iter()
        .map(|rule| evaluate_rule(rule, metrics, spec))
        .collect();

    let issues: Vec<RuleIssue> = results
        .iter()
        .filter(|r| r.severity != Severity::Pass)
        .map(|r| RuleIssue {
            rule_id: r.rule_id.clone(),
            severity: r.severity,
            message: r.message.clone(),
        })
        .collect();

    RuleEvaluation {
        valid: !issues.iter().any(|i| i.severity == Severity::Fail),
        results,
        issues,
    }
}

fn evaluate_rule(rule: &RuleDefinition, metrics: &FrameMetrics, spec: &ExerciseRuleSpec) -> RuleResult {
    let (passed, value, fallback) = match &rule.kind {
        RuleKind::Ratio {
            numerator,
            denominator,
            min_ratio,
        } => match (metrics.metric(numerator), metrics.metric(denominator)) {
            (Some(num), Some(den)) if den > 0.0 => {
                let ratio = num / den;
                (ratio >= *min_ratio, Some(ratio), RATIO_BELOW_MIN_MESSAGE)
            }
            _ => (true, None, RATIO_BELOW_MIN_MESSAGE),
        },
        RuleKind::Max { metric, max } => match metrics.metric(metric) {
            Some(value) => (value <= *max, Some(value), ABOVE_MAX_MESSAGE),
            None => (true, None, ABOVE_MAX_MESSAGE),
        },
        RuleKind::Min { metric, min } => match metrics.metric(metric) {
            Some(value) => (value >= *min, Some(value), BELOW_MIN_MESSAGE),
            None => (true, None, BELOW_MIN_MESSAGE),
        },
        RuleKind::Unsupported { kind } => {
            log::trace!("[Rules] '{}' has unsupported type '{}', passing", rule.id, kind);
            (true, None, PASS_MESSAGE)
        }
    };

    let severity = if passed { Severity::Pass } else { rule.severity };
    let message = spec.message(&rule.id, severity).unwrap_or(if severity == Severity::Pass {
        PASS_MESSAGE
    } else {
        fallback
    });

    RuleResult {
        rule_id: rule.id.clone(),
        severity,
        message: message.to_string(),
        value,
    }
}
