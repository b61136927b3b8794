//! Metric Extractor - scalar squat metrics from one frame
//!
//! Given the chosen body side, the smoothed hip height and the calibrated
//! standing baseline, this module derives the fixed metric set the rep
//! counter and the rule evaluator consume:
//! - depth threshold: the hip height that counts as "down"
//! - up threshold: the hip height that counts as "standing again"
//! - torso angle: lean of the hip→shoulder segment away from vertical
//! - knee angle: interior hip–knee–ankle angle
//! - confidence: mean confidence of the joints used
//!
//! All values are in canvas pixels / degrees. Image y grows downward.

use serde::{Deserialize, Serialize};

use crate::config::{PoseConfig, RepConfig};
use crate::pose::{BodyObservation, BodySide, Point, PoseFrame};

/// Per-frame metrics, recomputed every frame and never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMetrics {
    pub side: BodySide,
    pub smoothed_hip_y: f64,
    pub baseline_y: f64,
    pub knee_y: f64,
    pub depth_threshold: f64,
    pub up_threshold: f64,
    pub torso_angle_deg: f64,
    pub knee_angle_deg: f64,
    pub confidence: f64,
    /// Current hip travel below the standing baseline
    pub hip_drop: f64,
    /// Baseline-to-knee span
    pub knee_drop: f64,
    /// Deepest hip travel of the most recent completed descent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rep_hip_drop: Option<f64>,
}

impl FrameMetrics {
    /// Look up a metric by the name used in rule specs
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "smoothed_hip_y" | "hip_y" => Some(self.smoothed_hip_y),
            "baseline_y" | "baseline" => Some(self.baseline_y),
            "knee_y" => Some(self.knee_y),
            "depth_threshold" => Some(self.depth_threshold),
            "up_threshold" => Some(self.up_threshold),
            "torso_angle_deg" | "torso_angle" => Some(self.torso_angle_deg),
            "knee_angle_deg" | "knee_angle" => Some(self.knee_angle_deg),
            "confidence" => Some(self.confidence),
            "hip_drop" => Some(self.hip_drop),
            "knee_drop" => Some(self.knee_drop),
            "rep_hip_drop" | "rep_depth" => self.rep_hip_drop,
            _ => None,
        }
    }
}

/// Computes [`FrameMetrics`] from a pose frame
#[derive(Debug, Clone)]
pub struct MetricExtractor {
    pose: PoseConfig,
    down_fraction: f64,
    up_fraction: f64,
}

impl MetricExtractor {
    pub fn new(pose: PoseConfig, reps: &RepConfig) -> Self {
        Self {
            pose,
            down_fraction: reps.down_fraction,
            up_fraction: reps.up_fraction,
        }
    }

    /// Select the usable body side, or `None` while the full body is not visible
    pub fn observe(&self, frame: &PoseFrame) -> Option<BodyObservation> {
        BodyObservation::from_frame(frame, &self.pose)
    }

    /// Compute the metric set for a calibrated frame
    pub fn compute(&self, body: &BodyObservation, smoothed_hip_y: f64, baseline: f64) -> FrameMetrics {
        let knee_drop = body.knee.y - baseline;

        FrameMetrics {
            side: body.side,
            smoothed_hip_y,
            baseline_y: baseline,
            knee_y: body.knee.y,
            depth_threshold: baseline + self.down_fraction * knee_drop,
            up_threshold: baseline + self.up_fraction * knee_drop,
            torso_angle_deg: torso_angle_deg(body.hip, body.shoulder),
            knee_angle_deg: knee_angle_deg(body.hip, body.knee, body.ankle),
            confidence: body.confidence,
            hip_drop: smoothed_hip_y - baseline,
            knee_drop,
            rep_hip_drop: None,
        }
    }
}

/// Absolute deviation of hip→shoulder from vertical, in degrees
///
/// 0° is perfectly upright; a degenerate segment reads as upright.
pub fn torso_angle_deg(hip: Point, shoulder: Point) -> f64 {
    let dx = shoulder.x - hip.x;
    let dy = shoulder.y - hip.y;
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }
    dx.abs().atan2(dy.abs()).to_degrees()
}

/// Interior angle at the knee of the hip–knee–ankle triangle, in degrees
///
/// A zero-length limb reads as 180° (no flexion detected).
pub fn knee_angle_deg(hip: Point, knee: Point, ankle: Point) -> f64 {
    let (ax, ay) = (hip.x - knee.x, hip.y - knee.y);
    let (bx, by) = (ankle.x - knee.x, ankle.y - knee.y);
    let len_a = (ax * ax + ay * ay).sqrt();
    let len_b = (bx * bx + by * by).sqrt();
    if len_a == 0.0 || len_b == 0.0 {
        return 180.0;
    }
    let cos = ((ax * bx + ay * by) / (len_a * len_b)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Keypoint, Landmark};

    fn p(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    fn body(hip: Point, knee: Point, ankle: Point, shoulder: Point) -> BodyObservation {
        BodyObservation {
            side: BodySide::Left,
            hip,
            knee,
            ankle,
            shoulder,
            confidence: 0.8,
        }
    }

    #[test]
    fn test_upright_torso_is_zero() {
        assert_eq!(torso_angle_deg(p(100.0, 300.0), p(100.0, 150.0)), 0.0);
    }

    #[test]
    fn test_torso_lean_is_absolute() {
        let forward = torso_angle_deg(p(100.0, 300.0), p(200.0, 200.0));
        let backward = torso_angle_deg(p(100.0, 300.0), p(0.0, 200.0));
        assert!((forward - 45.0).abs() < 1e-9);
        assert!((backward - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_straight_leg_is_180() {
        let angle = knee_angle_deg(p(100.0, 300.0), p(100.0, 400.0), p(100.0, 500.0));
        assert!((angle - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_right_angle_knee() {
        let angle = knee_angle_deg(p(200.0, 400.0), p(100.0, 400.0), p(100.0, 500.0));
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_knee_reads_no_flexion() {
        let angle = knee_angle_deg(p(100.0, 400.0), p(100.0, 400.0), p(100.0, 500.0));
        assert_eq!(angle, 180.0);
    }

    #[test]
    fn test_depth_threshold_scenario() {
        let extractor = MetricExtractor::new(PoseConfig::default(), &RepConfig::default());
        let b = body(p(100.0, 300.0), p(100.0, 400.0), p(100.0, 470.0), p(100.0, 150.0));

        let metrics = extractor.compute(&b, 300.0, 300.0);
        assert!((metrics.depth_threshold - 335.0).abs() < 1e-9);
        assert!((metrics.up_threshold - 310.0).abs() < 1e-9);
        assert!((metrics.knee_drop - 100.0).abs() < 1e-9);
        assert_eq!(metrics.hip_drop, 0.0);
    }

    #[test]
    fn test_metric_lookup_aliases() {
        let extractor = MetricExtractor::new(PoseConfig::default(), &RepConfig::default());
        let b = body(p(100.0, 300.0), p(100.0, 400.0), p(100.0, 470.0), p(100.0, 150.0));
        let mut metrics = extractor.compute(&b, 320.0, 300.0);

        assert_eq!(metrics.metric("torso_angle"), metrics.metric("torso_angle_deg"));
        assert_eq!(metrics.metric("hip_drop"), Some(20.0));
        assert_eq!(metrics.metric("rep_hip_drop"), None);
        assert_eq!(metrics.metric("elbow_angle"), None);

        metrics.rep_hip_drop = Some(45.0);
        assert_eq!(metrics.metric("rep_depth"), Some(45.0));
    }

    #[test]
    fn test_observe_requires_full_side() {
        let extractor = MetricExtractor::new(PoseConfig::default(), &RepConfig::default());
        let frame = PoseFrame::new(
            vec![
                Keypoint::new(Landmark::LeftHip, 100.0, 300.0, 0.9),
                Keypoint::new(Landmark::LeftKnee, 100.0, 400.0, 0.9),
            ],
            640.0,
            480.0,
        );
        assert!(extractor.observe(&frame).is_none());
    }
}
