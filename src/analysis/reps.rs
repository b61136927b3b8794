//! Rep Counter - two-state hysteresis on the smoothed hip height
//!
//! The hip must cross the deeper `depth_threshold` to enter `Down` and rise
//! above the shallower `up_threshold` to return to `Up`. The gap between the
//! two bars keeps jitter around either one from producing phantom reps.
//!
//! Entry into `Down` is additionally gated on the recent movement amplitude
//! and on mean keypoint confidence, so a person simply standing lower in the
//! frame, or a flickering detection, is not mistaken for a descent.

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::metrics::FrameMetrics;
use crate::config::RepConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepPhase {
    Up,
    Down,
}

/// Emitted once per completed repetition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepEvent {
    pub count: u32,
}

/// Tracks one descent below the up bar and its deepest point
#[derive(Debug, Clone, Copy)]
struct DescentCycle {
    peak_drop: f64,
}

#[derive(Debug)]
pub struct RepCounter {
    config: RepConfig,
    phase: RepPhase,
    count: u32,
    hip_history: VecDeque<f64>,
    confidence_history: VecDeque<f64>,
    last_rep_at: Option<Instant>,
    cycle: Option<DescentCycle>,
    last_cycle_drop: Option<f64>,
}

impl RepCounter {
    pub fn new(config: RepConfig) -> Self {
        let history_len = config.history_len.max(2);
        Self {
            config,
            phase: RepPhase::Up,
            count: 0,
            hip_history: VecDeque::with_capacity(history_len),
            confidence_history: VecDeque::with_capacity(history_len),
            last_rep_at: None,
            cycle: None,
            last_cycle_drop: None,
        }
    }

    pub fn phase(&self) -> RepPhase {
        self.phase
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Drop of the most recent completed descent below the up bar
    pub fn last_descent_drop(&self) -> Option<f64> {
        self.last_cycle_drop
    }

    /// Advance the state machine by one frame
    pub fn update(&mut self, metrics: &FrameMetrics, now: Instant) -> Option<RepEvent> {
        let hip = metrics.smoothed_hip_y;
        self.push_history(hip, metrics.confidence);
        self.track_descent(metrics);

        match self.phase {
            RepPhase::Up => {
                if hip >= metrics.depth_threshold && self.amplitude_ok() && self.confidence_ok() {
                    self.phase = RepPhase::Down;
                    log::debug!(
                        "[Reps] Down at hip={:.1} (depth bar {:.1})",
                        hip,
                        metrics.depth_threshold
                    );
                }
                None
            }
            RepPhase::Down => {
                if hip < metrics.up_threshold && self.interval_elapsed(now) {
                    self.phase = RepPhase::Up;
                    self.count += 1;
                    self.last_rep_at = Some(now);
                    self.hip_history.clear();
                    self.confidence_history.clear();
                    log::info!("[Reps] Rep {} counted", self.count);
                    Some(RepEvent { count: self.count })
                } else {
                    None
                }
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    fn push_history(&mut self, hip: f64, confidence: f64) {
        let cap = self.config.history_len.max(2);
        if self.hip_history.len() == cap {
            self.hip_history.pop_front();
        }
        if self.confidence_history.len() == cap {
            self.confidence_history.pop_front();
        }
        self.hip_history.push_back(hip);
        self.confidence_history.push_back(confidence);
    }

    fn track_descent(&mut self, metrics: &FrameMetrics) {
        let below_up_bar = metrics.smoothed_hip_y >= metrics.up_threshold;
        match (self.cycle.as_mut(), below_up_bar) {
            (Some(cycle), true) => {
                cycle.peak_drop = cycle.peak_drop.max(metrics.hip_drop);
            }
            (None, true) => {
                self.cycle = Some(DescentCycle {
                    peak_drop: metrics.hip_drop,
                });
            }
            (Some(cycle), false) => {
                let peak = cycle.peak_drop;
                self.cycle = None;
                if peak >= self.config.min_amplitude_px {
                    self.last_cycle_drop = Some(peak);
                }
            }
            (None, false) => {}
        }
    }

    fn amplitude_ok(&self) -> bool {
        let (min, max) = self
            .hip_history
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        self.hip_history.len() >= 2 && max - min > self.config.min_amplitude_px
    }

    fn confidence_ok(&self) -> bool {
        if self.confidence_history.is_empty() {
            return false;
        }
        let mean =
            self.confidence_history.iter().sum::<f64>() / self.confidence_history.len() as f64;
        mean > self.config.min_confidence
    }

    fn interval_elapsed(&self, now: Instant) -> bool {
        match self.last_rep_at {
            Some(last) => now.saturating_duration_since(last) >= self.config.min_rep_interval(),
            None => true,
        }
    }
}
