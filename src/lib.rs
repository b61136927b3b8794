// Squat Coach Core - rep detection and feedback gating engine
// Frame-driven pipeline: keypoints -> metrics -> reps/rules -> spoken corrections

// Module declarations
pub mod analysis;
pub mod calibration;
pub mod config;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod fixtures;
pub mod http;
pub mod pose;
pub mod rules;
pub mod speech;
pub mod telemetry;

// Re-exports for convenience
pub use config::AppConfig;
pub use engine::{CoachingSession, FrameEffects, SessionSnapshot, SessionStatus};
pub use pose::{Keypoint, Landmark, PoseFrame};
pub use rules::{ExerciseRuleSpec, RuleCatalog};

/// Install the default `tracing` subscriber for binaries and demos.
///
/// `log` records from leaf modules are bridged into the subscriber.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
