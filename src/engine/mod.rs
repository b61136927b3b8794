//! Coaching engine: the per-frame session and the async loop that feeds it.
//!
//! - `clock`: injectable time sources
//! - `session`: synchronous frame pipeline and its status types
//! - `runner`: pose-source loop, speech dispatch and event fan-out

pub mod clock;
pub mod runner;
pub mod session;

pub use clock::{ManualTimeSource, SystemTimeSource, TimeSource, TokioTimeSource};
pub use runner::{PoseSource, RecordingSource, RunSummary, SessionRunner};
pub use session::{
    CoachingSession, FrameEffects, SessionSnapshot, SessionState, SessionStatus,
    WAITING_FOR_BODY_MESSAGE,
};
