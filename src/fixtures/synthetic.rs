//! Synthetic side-view squat generator.
//!
//! Produces a deterministic (seeded) pose stream: a standing period long
//! enough to calibrate, followed by `reps` descents with cosine easing.
//! Depth, torso lean, keypoint jitter and confidence are tunable so tests
//! and the CLI can script good and bad form.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::recording::PoseRecording;
use crate::pose::{Keypoint, Landmark, PoseFrame};

const HIP_X: f64 = 320.0;
const STANDING_HIP_Y: f64 = 300.0;
const KNEE_Y: f64 = 400.0;
const ANKLE_Y: f64 = 470.0;
const TORSO_LEN: f64 = 150.0;
const SOURCE_WIDTH: f64 = 640.0;
const SOURCE_HEIGHT: f64 = 480.0;

/// Left-side frame with the default skeleton geometry
///
/// `lean_deg` tilts the hip→shoulder segment forward of vertical.
pub fn side_view_frame(hip_y: f64, lean_deg: f64, confidence: f64) -> PoseFrame {
    skeleton_frame(HIP_X, hip_y, HIP_X + 10.0, lean_deg, confidence)
}

fn skeleton_frame(hip_x: f64, hip_y: f64, knee_x: f64, lean_deg: f64, confidence: f64) -> PoseFrame {
    let lean = lean_deg.to_radians();
    PoseFrame::new(
        vec![
            Keypoint::new(
                Landmark::LeftShoulder,
                hip_x + TORSO_LEN * lean.sin(),
                hip_y - TORSO_LEN * lean.cos(),
                confidence,
            ),
            Keypoint::new(Landmark::LeftHip, hip_x, hip_y, confidence),
            Keypoint::new(Landmark::LeftKnee, knee_x, KNEE_Y, confidence),
            Keypoint::new(Landmark::LeftAnkle, HIP_X, ANKLE_Y, confidence),
        ],
        SOURCE_WIDTH,
        SOURCE_HEIGHT,
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSquat {
    pub reps: u32,
    pub frame_interval_ms: u64,
    /// Standing time before the first rep
    pub stand_ms: u64,
    pub descent_ms: u64,
    pub hold_ms: u64,
    pub ascent_ms: u64,
    /// Standing time between reps and after the last one
    pub rest_ms: u64,
    /// Deepest hip position as a fraction of the standing-hip-to-knee span
    pub depth_fraction: f64,
    /// Forward lean reached at the bottom of each rep
    pub torso_lean_deg: f64,
    /// Uniform noise added to every coordinate
    pub jitter_px: f64,
    pub confidence: f64,
    pub seed: u64,
}

impl Default for SyntheticSquat {
    fn default() -> Self {
        Self {
            reps: 3,
            frame_interval_ms: 100,
            stand_ms: 5000,
            descent_ms: 1000,
            hold_ms: 300,
            ascent_ms: 1000,
            rest_ms: 1500,
            depth_fraction: 0.8,
            torso_lean_deg: 10.0,
            jitter_px: 0.5,
            confidence: 0.9,
            seed: 7,
        }
    }
}

impl SyntheticSquat {
    fn rep_ms(&self) -> u64 {
        self.descent_ms + self.hold_ms + self.ascent_ms + self.rest_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.stand_ms + self.reps as u64 * self.rep_ms()
    }

    /// Squat progress in [0, 1] at `t_ms` (0 standing, 1 deepest)
    fn progress_at(&self, t_ms: u64) -> f64 {
        if t_ms < self.stand_ms || self.rep_ms() == 0 {
            return 0.0;
        }
        let t = t_ms - self.stand_ms;
        if t >= self.reps as u64 * self.rep_ms() {
            return 0.0;
        }

        let phase = t % self.rep_ms();
        let ease = |x: f64| (1.0 - (PI * x).cos()) / 2.0;
        if phase < self.descent_ms {
            ease(phase as f64 / self.descent_ms as f64)
        } else if phase < self.descent_ms + self.hold_ms {
            1.0
        } else if phase < self.descent_ms + self.hold_ms + self.ascent_ms {
            let x = (phase - self.descent_ms - self.hold_ms) as f64 / self.ascent_ms as f64;
            1.0 - ease(x)
        } else {
            0.0
        }
    }

    pub fn frames(&self) -> Vec<PoseFrame> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let interval = self.frame_interval_ms.max(1);
        let depth_px = self.depth_fraction * (KNEE_Y - STANDING_HIP_Y);

        (0..=self.duration_ms() / interval)
            .map(|i| {
                let t_ms = i * interval;
                let progress = self.progress_at(t_ms);
                let mut noise = || {
                    if self.jitter_px > 0.0 {
                        rng.gen_range(-self.jitter_px..=self.jitter_px)
                    } else {
                        0.0
                    }
                };

                let hip_y = STANDING_HIP_Y + depth_px * progress + noise();
                let hip_x = HIP_X - 30.0 * progress + noise();
                let knee_x = HIP_X + 10.0 + 30.0 * progress + noise();
                skeleton_frame(
                    hip_x,
                    hip_y,
                    knee_x,
                    self.torso_lean_deg * progress,
                    self.confidence,
                )
                .with_timestamp(t_ms)
            })
            .collect()
    }

    pub fn recording(&self, name: &str) -> PoseRecording {
        PoseRecording {
            name: name.to_string(),
            notes: Some(format!(
                "synthetic: {} reps, depth {:.2}, lean {:.0} deg, seed {}",
                self.reps, self.depth_fraction, self.torso_lean_deg, self.seed
            )),
            frame_interval_ms: self.frame_interval_ms,
            frames: self.frames(),
        }
    }
}
