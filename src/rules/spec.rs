//! Exercise rule specs
//!
//! A rule spec is an external, declarative description of what good form
//! looks like for one exercise. The JSON form carries a string `type` tag
//! and loosely named numeric parameters; it is decoded exactly once into
//! [`RuleKind`], a closed set of rule variants, so evaluation never has to
//! look at strings again.
//!
//! ```json
//! {
//!   "exercise": "squat",
//!   "min_confidence": 0.5,
//!   "rules": [
//!     { "id": "depth", "type": "ratio", "min_ratio": 0.35 },
//!     { "id": "torso_lean", "type": "max", "metric": "torso_angle_deg", "max_deg": 25 },
//!     { "id": "knee_bend", "type": "min", "min_deg": 80, "severity": "fail" }
//!   ],
//!   "messages": { "depth": { "warn": "Squat deeper" } }
//! }
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::RuleSpecError;

/// Outcome severity, ordered `Pass < Warn < Fail`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Pass,
    Warn,
    Fail,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Warn
    }
}

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_MIN_RATIO: f64 = 0.35;
pub const DEFAULT_MAX_TORSO_DEG: f64 = 25.0;
pub const DEFAULT_MIN_KNEE_DEG: f64 = 80.0;

/// Closed set of rule kinds
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    /// `numerator / denominator >= min_ratio`
    Ratio {
        numerator: String,
        denominator: String,
        min_ratio: f64,
    },
    /// `metric <= max`
    Max { metric: String, max: f64 },
    /// `metric >= min`
    Min { metric: String, min: f64 },
    /// Unknown tag; always passes
    Unsupported { kind: String },
}

impl RuleKind {
    pub fn tag(&self) -> &str {
        match self {
            RuleKind::Ratio { .. } => "ratio",
            RuleKind::Max { .. } => "max",
            RuleKind::Min { .. } => "min",
            RuleKind::Unsupported { kind } => kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRuleDefinition", into = "RawRuleDefinition")]
pub struct RuleDefinition {
    pub id: String,
    pub kind: RuleKind,
    /// Severity reported when the rule is not met
    pub severity: Severity,
}

impl RuleDefinition {
    pub fn ratio(id: &str, numerator: &str, denominator: &str, min_ratio: f64) -> Self {
        Self {
            id: id.to_string(),
            kind: RuleKind::Ratio {
                numerator: numerator.to_string(),
                denominator: denominator.to_string(),
                min_ratio,
            },
            severity: Severity::Warn,
        }
    }

    pub fn max(id: &str, metric: &str, max: f64) -> Self {
        Self {
            id: id.to_string(),
            kind: RuleKind::Max {
                metric: metric.to_string(),
                max,
            },
            severity: Severity::Warn,
        }
    }

    pub fn min(id: &str, metric: &str, min: f64) -> Self {
        Self {
            id: id.to_string(),
            kind: RuleKind::Min {
                metric: metric.to_string(),
                min,
            },
            severity: Severity::Warn,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// Wire shape of a rule definition
#[derive(Debug, Serialize, Deserialize)]
struct RawRuleDefinition {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    numerator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    denominator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_ratio: Option<f64>,
    #[serde(default, alias = "max_deg", skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(default, alias = "min_deg", skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(default)]
    severity: Severity,
}

impl From<RawRuleDefinition> for RuleDefinition {
    fn from(raw: RawRuleDefinition) -> Self {
        let kind = match raw.kind.as_str() {
            "ratio" => RuleKind::Ratio {
                numerator: raw.numerator.unwrap_or_else(|| "rep_hip_drop".to_string()),
                denominator: raw.denominator.unwrap_or_else(|| "knee_drop".to_string()),
                min_ratio: raw.min_ratio.unwrap_or(DEFAULT_MIN_RATIO),
            },
            "max" => RuleKind::Max {
                metric: raw.metric.unwrap_or_else(|| "torso_angle_deg".to_string()),
                max: raw.max.unwrap_or(DEFAULT_MAX_TORSO_DEG),
            },
            "min" => RuleKind::Min {
                metric: raw.metric.unwrap_or_else(|| "knee_angle_deg".to_string()),
                min: raw.min.unwrap_or(DEFAULT_MIN_KNEE_DEG),
            },
            other => RuleKind::Unsupported {
                kind: other.to_string(),
            },
        };

        Self {
            id: raw.id,
            kind,
            severity: raw.severity,
        }
    }
}

impl From<RuleDefinition> for RawRuleDefinition {
    fn from(rule: RuleDefinition) -> Self {
        let mut raw = RawRuleDefinition {
            id: rule.id,
            kind: rule.kind.tag().to_string(),
            metric: None,
            numerator: None,
            denominator: None,
            min_ratio: None,
            max: None,
            min: None,
            severity: rule.severity,
        };
        match rule.kind {
            RuleKind::Ratio {
                numerator,
                denominator,
                min_ratio,
            } => {
                raw.numerator = Some(numerator);
                raw.denominator = Some(denominator);
                raw.min_ratio = Some(min_ratio);
            }
            RuleKind::Max { metric, max } => {
                raw.metric = Some(metric);
                raw.max = Some(max);
            }
            RuleKind::Min { metric, min } => {
                raw.metric = Some(metric);
                raw.min = Some(min);
            }
            RuleKind::Unsupported { .. } => {}
        }
        raw
    }
}

/// Message text per outcome severity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityMessages {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<String>,
}

impl SeverityMessages {
    pub fn get(&self, severity: Severity) -> Option<&str> {
        match severity {
            Severity::Pass => self.pass.as_deref(),
            Severity::Warn => self.warn.as_deref(),
            Severity::Fail => self.fail.as_deref(),
        }
    }
}

fn default_min_confidence() -> f64 {
    DEFAULT_MIN_CONFIDENCE
}

/// Declarative form rules for one exercise; immutable once fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRuleSpec {
    pub exercise: String,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Evaluated in declaration order
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
    /// rule id → severity → text
    #[serde(default)]
    pub messages: HashMap<String, SeverityMessages>,
}

impl ExerciseRuleSpec {
    /// Built-in fallback: minimum depth ratio plus maximum torso lean
    pub fn builtin(exercise: &str) -> Self {
        let mut messages = HashMap::new();
        messages.insert(
            "depth".to_string(),
            SeverityMessages {
                pass: Some("Good depth".to_string()),
                warn: Some("Squat a little deeper".to_string()),
                fail: Some("Go deeper - hips toward knee height".to_string()),
            },
        );
        messages.insert(
            "torso_lean".to_string(),
            SeverityMessages {
                pass: Some("Nice upright chest".to_string()),
                warn: Some("Keep your chest up".to_string()),
                fail: Some("Too much forward lean".to_string()),
            },
        );

        Self {
            exercise: exercise.to_string(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            rules: vec![
                RuleDefinition::ratio("depth", "rep_hip_drop", "knee_drop", DEFAULT_MIN_RATIO),
                RuleDefinition::max("torso_lean", "torso_angle_deg", DEFAULT_MAX_TORSO_DEG),
            ],
            messages,
        }
    }

    /// Decode and validate a JSON rule spec document
    pub fn from_json(json: &str) -> Result<Self, RuleSpecError> {
        let spec: Self = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn message(&self, rule_id: &str, severity: Severity) -> Option<&str> {
        self.messages.get(rule_id).and_then(|m| m.get(severity))
    }

    /// Reject thresholds evaluation cannot work with
    pub fn validate(&self) -> Result<(), RuleSpecError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(RuleSpecError::InvalidRule {
                rule_id: "min_confidence".to_string(),
                reason: format!("{} outside [0, 1]", self.min_confidence),
            });
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.id.is_empty() {
                return Err(RuleSpecError::InvalidRule {
                    rule_id: String::new(),
                    reason: "rule id must not be empty".to_string(),
                });
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(RuleSpecError::InvalidRule {
                    rule_id: rule.id.clone(),
                    reason: "duplicate rule id".to_string(),
                });
            }

            let threshold = match &rule.kind {
                RuleKind::Ratio { min_ratio, .. } => Some(*min_ratio),
                RuleKind::Max { max, .. } => Some(*max),
                RuleKind::Min { min, .. } => Some(*min),
                RuleKind::Unsupported { .. } => None,
            };
            if let Some(value) = threshold.filter(|v| !v.is_finite()) {
                return Err(RuleSpecError::InvalidRule {
                    rule_id: rule.id.clone(),
                    reason: format!("threshold {} is not finite", value),
                });
            }
        }
        Ok(())
    }
}
