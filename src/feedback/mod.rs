// Feedback module - spoken-correction scheduling
//
// FeedbackGate consumes one RuleEvaluation per frame and yields a status
// message plus, at most, one SpeechRequest. Speech availability is
// consulted through SpeechReadiness so the gate never counts an utterance
// the speech path could not take.

pub mod gate;
pub mod state;

pub use gate::{AlwaysReady, FeedbackGate, GateDecision, SpeechReadiness, SpeechRequest, GOOD_FORM_MESSAGE};
pub use state::{FeedbackState, IssueFeedbackState};
