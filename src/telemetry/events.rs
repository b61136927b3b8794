//! Core telemetry event types describing coaching diagnostics exposed to
//! the CLI and the debug HTTP surface.

use serde::{Deserialize, Serialize};

/// How a speech request ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpeechSettlement {
    Spoken,
    RateLimited,
    Failed,
}

/// Diagnostic error codes surfaced via telemetry metrics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticError {
    RuleSpecFetch,
    SpeechProvider,
}

/// Session-level events: reps, calibration, speech traffic and errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    CalibrationComplete {
        baseline: f64,
    },
    RepCounted {
        count: u32,
        timestamp_ms: u64,
    },
    SpeechRequested {
        issue_id: String,
        forced: bool,
    },
    SpeechSettled {
        outcome: SpeechSettlement,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_after_ms: Option<u64>,
    },
    SpeechLatency {
        avg_ms: f32,
        max_ms: f32,
        sample_count: usize,
    },
    Error {
        code: DiagnosticError,
        context: String,
    },
}
