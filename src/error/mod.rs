// Error types for the squat coaching engine
//
// This module defines custom error types for calibration, rule specs, speech
// synthesis and configuration, providing structured error handling with
// numeric error codes suitable for UI and telemetry reporting.

mod calibration;
mod config;
mod rules;
mod speech;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use config::{ConfigError, ConfigErrorCodes};
pub use rules::{log_rule_spec_error, RuleSpecError, RuleSpecErrorCodes};
pub use speech::{log_speech_error, SpeechError, SpeechErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the session boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
