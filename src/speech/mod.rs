// Speech module - best-effort, rate-limited spoken feedback
//
// - provider: SpeechProvider trait, outcome decoding, HTTP implementation
// - dispatcher: single in-flight request, provider backoff, audio fan-out

pub mod dispatcher;
pub mod provider;

pub use dispatcher::{SpeechDispatcher, SynthesizedSpeech};
pub use provider::{HttpSpeechProvider, SpeechOutcome, SpeechProvider, MAX_RETRY_AFTER};
