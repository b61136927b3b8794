// CalibrationState - standing baseline storage
//
// Holds the stance samples collected so far and, once enough have been
// gathered, the frozen baseline hip height. The baseline is the median of
// the samples so that a few frames of fidgeting at the start of a session
// do not shift it.

use crate::error::CalibrationError;

/// Stance samples plus the frozen baseline
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CalibrationState {
    /// Smoothed hip y values collected while calibrating
    pub samples: Vec<f64>,
    /// Set once, never recomputed within a session
    pub baseline: Option<f64>,
}

impl CalibrationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_calibrated(&self) -> bool {
        self.baseline.is_some()
    }

    /// Compute a baseline from exactly `required` stance samples
    ///
    /// # Returns
    /// * `Ok(f64)` - Median of the samples
    /// * `Err(CalibrationError)` - Wrong sample count or a non-finite sample
    pub fn baseline_from_samples(samples: &[f64], required: usize) -> Result<f64, CalibrationError> {
        if samples.len() < required || samples.is_empty() {
            return Err(CalibrationError::InsufficientSamples {
                required,
                collected: samples.len(),
            });
        }

        if let Some((index, &value)) = samples.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(CalibrationError::InvalidSample { index, value });
        }

        Ok(median(samples))
    }
}

/// Median; even counts average the two middle values
pub(crate) fn median(samples: &[f64]) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
