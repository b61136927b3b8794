//! End-to-end checks of the public session API
//!
//! Rule specs come from the shipped `assets/rules` directory, frames from
//! the synthetic generator, and time from the recording timestamps.

use std::path::PathBuf;
use std::sync::Arc;

use squat_coach::config::AppConfig;
use squat_coach::fixtures::{replay, SyntheticSquat};
use squat_coach::rules::{DirectoryRuleSource, RuleCatalog, Severity};
use squat_coach::telemetry::{self, MetricEvent};

fn asset_catalog() -> RuleCatalog {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/rules");
    RuleCatalog::new(Box::new(DirectoryRuleSource::new(dir)))
}

#[test]
fn shipped_config_loads_and_validates() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/coach_config.json");
    let config = AppConfig::load_from_file(path);
    config.validate().expect("shipped config is valid");
    assert_eq!(config.session.exercise, "squat");
    assert!(config.session.rules_dir.is_some());
}

#[test]
fn shipped_squat_rules_are_stricter_than_builtin() {
    let spec = asset_catalog().resolve("squat");
    let depth = spec.rules.iter().find(|r| r.id == "depth").expect("depth rule");
    assert_eq!(depth.severity, Severity::Fail);
    assert_eq!(
        spec.message("depth", Severity::Fail),
        Some("Get your hips down to knee level")
    );
}

#[test]
fn unknown_exercise_falls_back_to_builtin() {
    let spec = asset_catalog().resolve("lunge");
    assert_eq!(spec.exercise, "lunge");
    assert_eq!(spec.rules.len(), 2);
}

#[test]
fn half_squats_count_but_are_corrected() {
    let spec = asset_catalog().resolve("squat");
    let squat = SyntheticSquat {
        depth_fraction: 0.45,
        jitter_px: 0.0,
        ..Default::default()
    };

    let report = replay(&squat.recording("half"), &AppConfig::default(), spec);

    assert_eq!(report.rep_count, 3);
    assert!(report.issue_frames.get("depth").copied().unwrap_or(0) > 0);
    let cue = report
        .cues
        .iter()
        .find(|cue| cue.issue_id == "depth")
        .expect("depth cue spoken");
    assert_eq!(cue.text, "Get your hips down to knee level");
}

#[test]
fn deep_squats_pass_shipped_rules() {
    let spec = asset_catalog().resolve("squat");
    let report = replay(
        &SyntheticSquat::default().recording("deep"),
        &AppConfig::default(),
        spec,
    );

    assert_eq!(report.rep_count, 3);
    assert!(report.cues.is_empty(), "unexpected cues: {:?}", report.cues);
}

#[test]
fn lost_body_delays_calibration() {
    let mut recording = SyntheticSquat {
        reps: 1,
        stand_ms: 8000,
        ..Default::default()
    }
    .recording("dropout");
    // Body disappears for one frame midway through the stand
    recording.frames[20].keypoints.clear();

    let report = replay(
        &recording,
        &AppConfig::default(),
        Arc::new(squat_coach::ExerciseRuleSpec::builtin("squat")),
    );

    assert_eq!(report.calibrated_at_ms, Some(6000));
    assert_eq!(report.rep_count, 1);
}

#[test]
fn rep_telemetry_reaches_the_hub() {
    let mut events = telemetry::hub().collector().subscribe();
    telemetry::hub().record_rep(7);

    let mut saw_rep = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, MetricEvent::RepCounted { count: 7, .. }) {
            saw_rep = true;
        }
    }
    assert!(saw_rep);
}
