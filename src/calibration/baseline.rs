//! Baseline Calibrator - collects stance samples and freezes the baseline
//!
//! The first `samples_required` smoothed hip positions after the body comes
//! into view are taken as the standing stance. Their median becomes the
//! baseline every threshold is expressed relative to.

use serde::{Deserialize, Serialize};

use super::state::CalibrationState;
use crate::config::CalibrationConfig;
use crate::error::{log_calibration_error, CalibrationError};

/// Progress reported after each observed sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CalibrationStatus {
    Calibrating { collected: usize, required: usize },
    Calibrated { baseline: f64 },
}

impl CalibrationStatus {
    pub fn is_calibrated(&self) -> bool {
        matches!(self, CalibrationStatus::Calibrated { .. })
    }
}

#[derive(Debug)]
pub struct BaselineCalibrator {
    config: CalibrationConfig,
    state: CalibrationState,
}

impl BaselineCalibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            state: CalibrationState::new(),
            config,
        }
    }

    /// Record one smoothed hip y and report progress
    ///
    /// Non-finite values are skipped. After the baseline is frozen this is a
    /// no-op.
    pub fn observe(&mut self, smoothed_hip_y: f64) -> CalibrationStatus {
        if let Some(baseline) = self.state.baseline {
            return CalibrationStatus::Calibrated { baseline };
        }

        if !smoothed_hip_y.is_finite() {
            log::warn!("[Calibration] Skipping non-finite sample {}", smoothed_hip_y);
            return self.status();
        }

        self.state.samples.push(smoothed_hip_y);
        if self.state.samples.len() < self.config.samples_required {
            return self.status();
        }

        match CalibrationState::baseline_from_samples(&self.state.samples, self.config.samples_required)
        {
            Ok(baseline) => {
                self.state.baseline = Some(baseline);
                log::info!(
                    "[Calibration] Baseline frozen at {:.1} from {} samples",
                    baseline,
                    self.state.samples.len()
                );
                CalibrationStatus::Calibrated { baseline }
            }
            Err(err) => {
                log_calibration_error(&err, "observe");
                self.state.samples.clear();
                self.status()
            }
        }
    }

    /// The body left the frame
    ///
    /// Discards partial progress when configured to restart; a frozen
    /// baseline is never affected.
    pub fn interrupt(&mut self) {
        if self.state.is_calibrated() || !self.config.restart_on_interruption {
            return;
        }
        if !self.state.samples.is_empty() {
            log::debug!(
                "[Calibration] Body lost, discarding {} samples",
                self.state.samples.len()
            );
            self.state.samples.clear();
        }
    }

    pub fn status(&self) -> CalibrationStatus {
        match self.state.baseline {
            Some(baseline) => CalibrationStatus::Calibrated { baseline },
            None => CalibrationStatus::Calibrating {
                collected: self.state.samples.len(),
                required: self.config.samples_required,
            },
        }
    }

    pub fn baseline(&self) -> Result<f64, CalibrationError> {
        self.state.baseline.ok_or(CalibrationError::NotComplete)
    }

    pub fn is_calibrated(&self) -> bool {
        self.state.is_calibrated()
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    /// Start over, forgetting any frozen baseline
    pub fn reset(&mut self) {
        self.state = CalibrationState::new();
    }
}

impl Default for BaselineCalibrator {
    fn default() -> Self {
        Self::new(CalibrationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn config(samples_required: usize, restart_on_interruption: bool) -> CalibrationConfig {
        CalibrationConfig {
            samples_required,
            restart_on_interruption,
        }
    }

    #[test]
    fn test_calibrates_after_required_samples() {
        let mut calibrator = BaselineCalibrator::default();

        for i in 0..39 {
            let status = calibrator.observe(300.0);
            assert_eq!(
                status,
                CalibrationStatus::Calibrating {
                    collected: i + 1,
                    required: 40
                }
            );
        }
        assert_eq!(calibrator.baseline(), Err(CalibrationError::NotComplete));

        let status = calibrator.observe(300.0);
        assert_eq!(status, CalibrationStatus::Calibrated { baseline: 300.0 });
        assert_eq!(calibrator.baseline(), Ok(300.0));
    }

    #[test]
    fn test_baseline_is_frozen() {
        let mut calibrator = BaselineCalibrator::new(config(3, true));
        calibrator.observe(300.0);
        calibrator.observe(302.0);
        calibrator.observe(304.0);

        for _ in 0..10 {
            assert_eq!(
                calibrator.observe(500.0),
                CalibrationStatus::Calibrated { baseline: 302.0 }
            );
        }
        calibrator.interrupt();
        assert_eq!(calibrator.baseline(), Ok(302.0));
    }

    #[test]
    fn test_even_count_median() {
        let mut calibrator = BaselineCalibrator::new(config(4, true));
        for value in [310.0, 300.0, 290.0, 320.0] {
            calibrator.observe(value);
        }
        assert_eq!(calibrator.baseline(), Ok(305.0));
    }

    #[test]
    fn test_permutation_invariant() {
        let samples: Vec<f64> = (0..40).map(|i| 280.0 + (i * 7 % 23) as f64).collect();
        let mut reference = BaselineCalibrator::default();
        samples.iter().for_each(|&v| {
            reference.observe(v);
        });
        let expected = reference.baseline().unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..5 {
            let mut shuffled = samples.clone();
            shuffled.shuffle(&mut rng);

            let mut calibrator = BaselineCalibrator::default();
            shuffled.iter().for_each(|&v| {
                calibrator.observe(v);
            });
            assert_eq!(calibrator.baseline(), Ok(expected));
        }
    }

    #[test]
    fn test_interruption_restarts_collection() {
        let mut calibrator = BaselineCalibrator::new(config(5, true));
        calibrator.observe(300.0);
        calibrator.observe(300.0);
        calibrator.interrupt();

        assert_eq!(
            calibrator.status(),
            CalibrationStatus::Calibrating {
                collected: 0,
                required: 5
            }
        );
    }

    #[test]
    fn test_interruption_ignored_when_not_restarting() {
        let mut calibrator = BaselineCalibrator::new(config(5, false));
        calibrator.observe(300.0);
        calibrator.observe(300.0);
        calibrator.interrupt();

        assert_eq!(
            calibrator.status(),
            CalibrationStatus::Calibrating {
                collected: 2,
                required: 5
            }
        );
    }

    #[test]
    fn test_non_finite_sample_skipped() {
        let mut calibrator = BaselineCalibrator::new(config(2, true));
        calibrator.observe(f64::NAN);
        assert_eq!(
            calibrator.status(),
            CalibrationStatus::Calibrating {
                collected: 0,
                required: 2
            }
        );
    }
}
