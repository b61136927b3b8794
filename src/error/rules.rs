// Exercise rule-spec error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Rule-spec error code constants
///
/// Error code range: 4001-4004
pub struct RuleSpecErrorCodes {}

impl RuleSpecErrorCodes {
    /// No rule spec exists for the requested exercise
    pub const NOT_FOUND: i32 = 4001;

    /// Rule spec could not be read
    pub const IO: i32 = 4002;

    /// Rule spec document is not valid JSON for the schema
    pub const PARSE: i32 = 4003;

    /// A rule carries parameters that cannot be evaluated
    pub const INVALID_RULE: i32 = 4004;
}

/// Log a rule-spec error with structured context
pub fn log_rule_spec_error(err: &RuleSpecError, context: &str) {
    error!(
        "Rule spec error in {}: code={}, component=RuleCatalog, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while fetching or decoding exercise rule specs
///
/// Error code ranges: 4001-4004
#[derive(Debug, Clone, PartialEq)]
pub enum RuleSpecError {
    /// Unknown exercise identifier
    NotFound { exercise: String },

    /// Filesystem or transport failure
    Io { path: String, reason: String },

    /// Malformed document
    Parse { reason: String },

    /// Rule parameters out of range
    InvalidRule { rule_id: String, reason: String },
}

impl ErrorCode for RuleSpecError {
    fn code(&self) -> i32 {
        match self {
            RuleSpecError::NotFound { .. } => RuleSpecErrorCodes::NOT_FOUND,
            RuleSpecError::Io { .. } => RuleSpecErrorCodes::IO,
            RuleSpecError::Parse { .. } => RuleSpecErrorCodes::PARSE,
            RuleSpecError::InvalidRule { .. } => RuleSpecErrorCodes::INVALID_RULE,
        }
    }

    fn message(&self) -> String {
        match self {
            RuleSpecError::NotFound { exercise } => {
                format!("No rule spec for exercise '{}'", exercise)
            }
            RuleSpecError::Io { path, reason } => {
                format!("Failed to read rule spec {}: {}", path, reason)
            }
            RuleSpecError::Parse { reason } => format!("Malformed rule spec: {}", reason),
            RuleSpecError::InvalidRule { rule_id, reason } => {
                format!("Invalid rule '{}': {}", rule_id, reason)
            }
        }
    }
}

impl fmt::Display for RuleSpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RuleSpecError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for RuleSpecError {}

impl From<serde_json::Error> for RuleSpecError {
    fn from(err: serde_json::Error) -> Self {
        RuleSpecError::Parse {
            reason: err.to_string(),
        }
    }
}
