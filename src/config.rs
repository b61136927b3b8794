//! Configuration management for coaching parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling fast iteration without recompilation. The rep-detection
//! thresholds, feedback timing windows and speech backoff are all tunables
//! rather than constants baked into the pipeline.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pose: PoseConfig,
    pub smoothing: SmoothingConfig,
    pub calibration: CalibrationConfig,
    pub reps: RepConfig,
    pub feedback: FeedbackConfig,
    pub speech: SpeechConfig,
    pub session: SessionConfig,
}

/// Keypoint usability and coordinate normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// Keypoints below this confidence are treated as missing
    pub min_keypoint_confidence: f64,
    /// Rendering canvas width all metrics are expressed in
    pub canvas_width: f64,
    /// Rendering canvas height all metrics are expressed in
    pub canvas_height: f64,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            min_keypoint_confidence: 0.3,
            canvas_width: 640.0,
            canvas_height: 480.0,
        }
    }
}

/// Hip-position smoothing window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Number of most recent raw values averaged
    pub window: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self { window: 6 }
    }
}

/// Standing-baseline calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Stance samples collected before the baseline freezes
    pub samples_required: usize,
    /// Discard partial calibration when the body leaves the frame
    pub restart_on_interruption: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            samples_required: 40,
            restart_on_interruption: true,
        }
    }
}

/// Rep-counter state machine thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepConfig {
    /// Fraction of the baseline-to-knee span the hip must pass to be "down"
    pub down_fraction: f64,
    /// Fraction of the baseline-to-knee span the hip must rise above to be "up"
    pub up_fraction: f64,
    /// Trailing window used for the amplitude and confidence gates
    pub history_len: usize,
    /// Minimum hip travel inside the window before a descent counts
    pub min_amplitude_px: f64,
    /// Minimum mean joint confidence inside the window
    pub min_confidence: f64,
    /// Minimum time between two counted reps
    pub min_rep_interval_ms: u64,
}

impl Default for RepConfig {
    fn default() -> Self {
        Self {
            down_fraction: 0.35,
            up_fraction: 0.10,
            history_len: 20,
            min_amplitude_px: 20.0,
            min_confidence: 0.5,
            min_rep_interval_ms: 1000,
        }
    }
}

impl RepConfig {
    pub fn min_rep_interval(&self) -> Duration {
        Duration::from_millis(self.min_rep_interval_ms)
    }
}

/// Spoken-feedback gating windows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Time an issue must persist before it may be spoken
    pub patience_ms: u64,
    /// Minimum time between two utterances of the same issue
    pub issue_cooldown_ms: u64,
    /// Utterance cap per issue until a good-form reset
    pub max_repeats_per_issue: u32,
    /// Minimum time between any two utterances
    pub global_gap_ms: u64,
    /// Continuous good form needed to clear issue bookkeeping
    pub good_form_reset_ms: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            patience_ms: 1500,
            issue_cooldown_ms: 8000,
            max_repeats_per_issue: 3,
            global_gap_ms: 2000,
            good_form_reset_ms: 5000,
        }
    }
}

impl FeedbackConfig {
    pub fn patience(&self) -> Duration {
        Duration::from_millis(self.patience_ms)
    }

    pub fn issue_cooldown(&self) -> Duration {
        Duration::from_millis(self.issue_cooldown_ms)
    }

    pub fn global_gap(&self) -> Duration {
        Duration::from_millis(self.global_gap_ms)
    }

    pub fn good_form_reset(&self) -> Duration {
        Duration::from_millis(self.good_form_reset_ms)
    }
}

/// Speech-synthesis provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// HTTP endpoint accepting `{ "text": ... }`; speech disabled when unset
    pub endpoint: Option<String>,
    /// Backoff applied when a rate limit carries no retry hint
    pub fallback_backoff_ms: u64,
    /// Concurrent synthesis requests allowed (only 1 is supported)
    pub max_concurrent_tts: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            fallback_backoff_ms: 8000,
            max_concurrent_tts: 1,
        }
    }
}

impl SpeechConfig {
    pub fn fallback_backoff(&self) -> Duration {
        Duration::from_millis(self.fallback_backoff_ms)
    }
}

/// Session scheduling and rule lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Exercise identifier used to fetch the rule spec
    pub exercise: String,
    /// Directory holding `<exercise>.json` rule specs
    pub rules_dir: Option<PathBuf>,
    /// Fixed scheduler cadence
    pub tick_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exercise: "squat".to_string(),
            rules_dir: None,
            tick_interval_ms: 100,
        }
    }
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// Missing sections and fields fall back to their defaults. If the file
    /// doesn't exist or the JSON is invalid, the full default config is
    /// returned and a warning is logged.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default asset location
    pub fn load() -> Self {
        Self::load_from_file("assets/coach_config.json")
    }

    /// Write configuration as pretty JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(|err| ConfigError::Io {
            reason: err.to_string(),
        })?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reject values the pipeline cannot operate with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pose.canvas_width <= 0.0 || self.pose.canvas_height <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "pose.canvas",
                reason: "canvas dimensions must be positive".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.pose.min_keypoint_confidence) {
            return Err(ConfigError::InvalidValue {
                field: "pose.min_keypoint_confidence",
                reason: format!("{} outside [0, 1]", self.pose.min_keypoint_confidence),
            });
        }
        if self.smoothing.window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "smoothing.window",
                reason: "window must hold at least one sample".to_string(),
            });
        }
        if self.calibration.samples_required == 0 {
            return Err(ConfigError::InvalidValue {
                field: "calibration.samples_required",
                reason: "at least one stance sample is required".to_string(),
            });
        }
        if self.reps.history_len < 2 {
            return Err(ConfigError::InvalidValue {
                field: "reps.history_len",
                reason: "amplitude needs at least two samples".to_string(),
            });
        }
        let reps = &self.reps;
        if !(reps.up_fraction > 0.0 && reps.up_fraction < reps.down_fraction && reps.down_fraction < 1.0)
        {
            return Err(ConfigError::InvalidValue {
                field: "reps.up_fraction",
                reason: format!(
                    "expected 0 < up ({}) < down ({}) < 1",
                    reps.up_fraction, reps.down_fraction
                ),
            });
        }
        if self.speech.max_concurrent_tts != 1 {
            return Err(ConfigError::InvalidValue {
                field: "speech.max_concurrent_tts",
                reason: "overlapping speech is not supported".to_string(),
            });
        }
        if self.session.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.tick_interval_ms",
                reason: "tick interval must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.smoothing.window, 6);
        assert_eq!(config.calibration.samples_required, 40);
        assert_eq!(config.reps.down_fraction, 0.35);
        assert_eq!(config.reps.up_fraction, 0.10);
        assert_eq!(config.feedback.max_repeats_per_issue, 3);
        assert_eq!(config.speech.fallback_backoff_ms, 8000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "reps": { "down_fraction": 0.4 }, "feedback": { "patience_ms": 500 } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.reps.down_fraction, 0.4);
        assert_eq!(config.reps.up_fraction, 0.10);
        assert_eq!(config.feedback.patience_ms, 500);
        assert_eq!(config.feedback.issue_cooldown_ms, 8000);
        assert_eq!(config.session.exercise, "squat");
    }

    #[test]
    fn test_validate_rejects_inverted_fractions() {
        let mut config = AppConfig::default();
        config.reps.up_fraction = 0.5;
        config.reps.down_fraction = 0.3;

        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "reps.up_fraction"),
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_concurrent_speech() {
        let mut config = AppConfig::default();
        config.speech.max_concurrent_tts = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/definitely/not/here/coach_config.json");
        assert_eq!(config.smoothing.window, 6);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.reps.min_amplitude_px, config.reps.min_amplitude_px);
        assert_eq!(
            parsed.calibration.restart_on_interruption,
            config.calibration.restart_on_interruption
        );
    }
}
