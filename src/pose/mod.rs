// Pose module - keypoint input model
//
// The pose-estimation model is an external collaborator. This module holds
// the read-only representation of its output and the side selection that
// turns a frame into the four joints the squat metrics need.

pub mod body;
pub mod keypoint;

pub use body::{BodyObservation, BodySide, Point};
pub use keypoint::{Keypoint, Landmark, PoseFrame};
