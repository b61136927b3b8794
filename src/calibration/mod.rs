// Calibration module - standing baseline for the session
//
// 1. CalibrationState: collected stance samples and the frozen baseline
// 2. BaselineCalibrator: feeds samples in, freezes the median, handles
//    the body leaving the frame mid-collection

pub mod baseline;
pub mod state;

pub use baseline::{BaselineCalibrator, CalibrationStatus};
pub use state::CalibrationState;
