//! Keypoint model for pose-estimation output
//!
//! Keypoints arrive from the external pose model in its own input
//! resolution. Landmarks follow the COCO 17-point layout and may be
//! identified either by index or by snake_case name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// COCO keypoint indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LandmarkRepr", rename_all = "snake_case")]
pub enum Landmark {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

const ALL_LANDMARKS: [Landmark; 17] = [
    Landmark::Nose,
    Landmark::LeftEye,
    Landmark::RightEye,
    Landmark::LeftEar,
    Landmark::RightEar,
    Landmark::LeftShoulder,
    Landmark::RightShoulder,
    Landmark::LeftElbow,
    Landmark::RightElbow,
    Landmark::LeftWrist,
    Landmark::RightWrist,
    Landmark::LeftHip,
    Landmark::RightHip,
    Landmark::LeftKnee,
    Landmark::RightKnee,
    Landmark::LeftAnkle,
    Landmark::RightAnkle,
];

impl Landmark {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        ALL_LANDMARKS.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Landmark::Nose => "nose",
            Landmark::LeftEye => "left_eye",
            Landmark::RightEye => "right_eye",
            Landmark::LeftEar => "left_ear",
            Landmark::RightEar => "right_ear",
            Landmark::LeftShoulder => "left_shoulder",
            Landmark::RightShoulder => "right_shoulder",
            Landmark::LeftElbow => "left_elbow",
            Landmark::RightElbow => "right_elbow",
            Landmark::LeftWrist => "left_wrist",
            Landmark::RightWrist => "right_wrist",
            Landmark::LeftHip => "left_hip",
            Landmark::RightHip => "right_hip",
            Landmark::LeftKnee => "left_knee",
            Landmark::RightKnee => "right_knee",
            Landmark::LeftAnkle => "left_ankle",
            Landmark::RightAnkle => "right_ankle",
        }
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Landmark {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_LANDMARKS
            .iter()
            .copied()
            .find(|landmark| landmark.name() == s)
            .ok_or_else(|| format!("unknown landmark '{}'", s))
    }
}

/// Wire representation: pose models emit either the COCO index or the name
#[derive(Deserialize)]
#[serde(untagged)]
enum LandmarkRepr {
    Index(usize),
    Name(String),
}

impl TryFrom<LandmarkRepr> for Landmark {
    type Error = String;

    fn try_from(repr: LandmarkRepr) -> Result<Self, Self::Error> {
        match repr {
            LandmarkRepr::Index(index) => {
                Landmark::from_index(index).ok_or_else(|| format!("landmark index {} out of range", index))
            }
            LandmarkRepr::Name(name) => name.parse(),
        }
    }
}

/// A single 2D landmark observation in source-frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    #[serde(alias = "id", alias = "index", alias = "name")]
    pub landmark: Landmark,
    pub x: f64,
    pub y: f64,
    #[serde(alias = "score")]
    pub confidence: f64,
}

impl Keypoint {
    pub fn new(landmark: Landmark, x: f64, y: f64, confidence: f64) -> Self {
        Self {
            landmark,
            x,
            y,
            confidence,
        }
    }

    /// Usable keypoints have finite coordinates and enough confidence
    pub fn is_usable(&self, min_confidence: f64) -> bool {
        self.confidence >= min_confidence && self.x.is_finite() && self.y.is_finite()
    }
}

/// Keypoints from one detection cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseFrame {
    pub keypoints: Vec<Keypoint>,
    /// Width of the image the pose model ran on
    pub source_width: f64,
    /// Height of the image the pose model ran on
    pub source_height: f64,
    /// Capture timestamp, when the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_ms: Option<u64>,
}

impl PoseFrame {
    pub fn new(keypoints: Vec<Keypoint>, source_width: f64, source_height: f64) -> Self {
        Self {
            keypoints,
            source_width,
            source_height,
            t_ms: None,
        }
    }

    pub fn with_timestamp(mut self, t_ms: u64) -> Self {
        self.t_ms = Some(t_ms);
        self
    }

    /// Most confident observation of a landmark (models occasionally repeat ids)
    pub fn get(&self, landmark: Landmark) -> Option<&Keypoint> {
        self.keypoints
            .iter()
            .filter(|kp| kp.landmark == landmark)
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }

    /// Landmark if usable, rescaled into canvas coordinates
    pub fn usable_on_canvas(
        &self,
        landmark: Landmark,
        min_confidence: f64,
        canvas_width: f64,
        canvas_height: f64,
    ) -> Option<Keypoint> {
        let kp = self.get(landmark)?;
        if !kp.is_usable(min_confidence) || self.source_width <= 0.0 || self.source_height <= 0.0 {
            return None;
        }
        Some(Keypoint {
            x: kp.x * canvas_width / self.source_width,
            y: kp.y * canvas_height / self.source_height,
            ..*kp
        })
    }
}
