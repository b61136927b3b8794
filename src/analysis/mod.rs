// Analysis module - per-frame squat signal processing
//
// Pipeline (driven by engine::session):
// - KeypointSmoother: moving average of the raw hip y
// - MetricExtractor: thresholds and joint angles on the canvas
// - RepCounter: Up/Down hysteresis producing RepEvents

pub mod metrics;
pub mod reps;
pub mod smoother;

pub use metrics::{knee_angle_deg, torso_angle_deg, FrameMetrics, MetricExtractor};
pub use reps::{RepCounter, RepEvent, RepPhase};
pub use smoother::KeypointSmoother;
