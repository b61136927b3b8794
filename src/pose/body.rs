//! Side selection for the squat joints.
//!
//! A squat is usually filmed from the side, so only one leg is reliably
//! visible. The side whose hip, knee, ankle and shoulder are all usable and
//! carry the higher mean confidence wins.

use serde::{Deserialize, Serialize};

use super::keypoint::{Keypoint, Landmark, PoseFrame};
use crate::config::PoseConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodySide {
    Left,
    Right,
}

impl BodySide {
    /// Hip, knee, ankle, shoulder for this side
    pub fn joints(self) -> [Landmark; 4] {
        match self {
            BodySide::Left => [
                Landmark::LeftHip,
                Landmark::LeftKnee,
                Landmark::LeftAnkle,
                Landmark::LeftShoulder,
            ],
            BodySide::Right => [
                Landmark::RightHip,
                Landmark::RightKnee,
                Landmark::RightAnkle,
                Landmark::RightShoulder,
            ],
        }
    }
}

/// 2D point in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl From<Keypoint> for Point {
    fn from(kp: Keypoint) -> Self {
        Self { x: kp.x, y: kp.y }
    }
}

/// Joints of the chosen side, already on the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyObservation {
    pub side: BodySide,
    pub hip: Point,
    pub knee: Point,
    pub ankle: Point,
    pub shoulder: Point,
    /// Mean confidence of the four joints
    pub confidence: f64,
}

impl BodyObservation {
    /// Returns `None` when neither side has all four joints usable
    pub fn from_frame(frame: &PoseFrame, config: &PoseConfig) -> Option<Self> {
        let left = Self::for_side(frame, config, BodySide::Left);
        let right = Self::for_side(frame, config, BodySide::Right);

        match (left, right) {
            (Some(l), Some(r)) => Some(if r.confidence > l.confidence { r } else { l }),
            (Some(l), None) => Some(l),
            (None, Some(r)) => Some(r),
            (None, None) => None,
        }
    }

    fn for_side(frame: &PoseFrame, config: &PoseConfig, side: BodySide) -> Option<Self> {
        let [hip, knee, ankle, shoulder] = side.joints().map(|landmark| {
            frame.usable_on_canvas(
                landmark,
                config.min_keypoint_confidence,
                config.canvas_width,
                config.canvas_height,
            )
        });
        let (hip, knee, ankle, shoulder) = (hip?, knee?, ankle?, shoulder?);

        let confidence =
            (hip.confidence + knee.confidence + ankle.confidence + shoulder.confidence) / 4.0;

        Some(Self {
            side,
            hip: hip.into(),
            knee: knee.into(),
            ankle: ankle.into(),
            shoulder: shoulder.into(),
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side_keypoints(side: BodySide, confidence: f64) -> Vec<Keypoint> {
        let [hip, knee, ankle, shoulder] = side.joints();
        vec![
            Keypoint::new(hip, 100.0, 300.0, confidence),
            Keypoint::new(knee, 105.0, 400.0, confidence),
            Keypoint::new(ankle, 100.0, 470.0, confidence),
            Keypoint::new(shoulder, 100.0, 150.0, confidence),
        ]
    }

    #[test]
    fn test_picks_more_confident_side() {
        let mut keypoints = side_keypoints(BodySide::Left, 0.6);
        keypoints.extend(side_keypoints(BodySide::Right, 0.9));
        let frame = PoseFrame::new(keypoints, 640.0, 480.0);

        let body = BodyObservation::from_frame(&frame, &PoseConfig::default()).unwrap();
        assert_eq!(body.side, BodySide::Right);
        assert!((body.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_missing_joint_falls_back_to_other_side() {
        let mut keypoints = side_keypoints(BodySide::Right, 0.9);
        keypoints.retain(|kp| kp.landmark != Landmark::RightAnkle);
        keypoints.extend(side_keypoints(BodySide::Left, 0.5));
        let frame = PoseFrame::new(keypoints, 640.0, 480.0);

        let body = BodyObservation::from_frame(&frame, &PoseConfig::default()).unwrap();
        assert_eq!(body.side, BodySide::Left);
    }

    #[test]
    fn test_incomplete_body_is_none() {
        let mut keypoints = side_keypoints(BodySide::Left, 0.9);
        keypoints.retain(|kp| kp.landmark != Landmark::LeftShoulder);
        let frame = PoseFrame::new(keypoints, 640.0, 480.0);

        assert!(BodyObservation::from_frame(&frame, &PoseConfig::default()).is_none());
    }
}
