// Calibration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Single source of truth for the numeric codes surfaced to the UI and to
/// telemetry.
///
/// Error code range: 2001-2003
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Insufficient stance samples collected for a baseline
    pub const INSUFFICIENT_SAMPLES: i32 = 2001;

    /// Baseline requested before calibration completed
    pub const NOT_COMPLETE: i32 = 2002;

    /// Sample value is not a finite pixel coordinate
    pub const INVALID_SAMPLE: i32 = 2003;
}

/// Log a calibration error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=BaselineCalibrator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// These errors cover baseline collection and median computation.
///
/// Error code ranges: 2001-2003
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Insufficient samples collected for calibration
    InsufficientSamples { required: usize, collected: usize },

    /// Calibration not complete
    NotComplete,

    /// Sample is NaN or infinite
    InvalidSample { index: usize, value: f64 },
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::InsufficientSamples { .. } => {
                CalibrationErrorCodes::INSUFFICIENT_SAMPLES
            }
            CalibrationError::NotComplete => CalibrationErrorCodes::NOT_COMPLETE,
            CalibrationError::InvalidSample { .. } => CalibrationErrorCodes::INVALID_SAMPLE,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::InsufficientSamples {
                required,
                collected,
            } => {
                format!("Insufficient samples: need {}, got {}", required, collected)
            }
            CalibrationError::NotComplete => "Calibration not complete".to_string(),
            CalibrationError::InvalidSample { index, value } => {
                format!("Invalid sample {}: {} is not a finite position", index, value)
            }
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}
