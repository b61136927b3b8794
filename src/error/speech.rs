// Speech synthesis error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Speech error code constants
///
/// Error code range: 3001-3004
pub struct SpeechErrorCodes {}

impl SpeechErrorCodes {
    /// Request never reached the provider or the connection dropped
    pub const TRANSPORT: i32 = 3001;

    /// Provider asked us to slow down
    pub const RATE_LIMITED: i32 = 3002;

    /// Provider answered with a non-success status
    pub const PROVIDER_FAILURE: i32 = 3003;

    /// Provider answered with something that is neither audio nor a known error shape
    pub const INVALID_RESPONSE: i32 = 3004;
}

/// Log a speech error with structured context
///
/// Speech errors are soft misses, so they are logged at warn level.
pub fn log_speech_error(err: &SpeechError, context: &str) {
    warn!(
        "Speech error in {}: code={}, component=SpeechDispatcher, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Speech-synthesis errors
///
/// None of these are fatal: the dispatcher converts them into backoff state
/// and the next natural qualification retries.
///
/// Error code ranges: 3001-3004
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechError {
    /// Network or client-side failure
    Transport { reason: String },

    /// Provider rate limit with the applied retry delay
    RateLimited { retry_after_ms: u64 },

    /// Provider reported a failure status
    ProviderFailure { status: u16, reason: String },

    /// Unrecognized response payload
    InvalidResponse { reason: String },
}

impl ErrorCode for SpeechError {
    fn code(&self) -> i32 {
        match self {
            SpeechError::Transport { .. } => SpeechErrorCodes::TRANSPORT,
            SpeechError::RateLimited { .. } => SpeechErrorCodes::RATE_LIMITED,
            SpeechError::ProviderFailure { .. } => SpeechErrorCodes::PROVIDER_FAILURE,
            SpeechError::InvalidResponse { .. } => SpeechErrorCodes::INVALID_RESPONSE,
        }
    }

    fn message(&self) -> String {
        match self {
            SpeechError::Transport { reason } => format!("Speech transport failed: {}", reason),
            SpeechError::RateLimited { retry_after_ms } => {
                format!("Speech rate limited, retry in {} ms", retry_after_ms)
            }
            SpeechError::ProviderFailure { status, reason } => {
                format!("Speech provider returned {}: {}", status, reason)
            }
            SpeechError::InvalidResponse { reason } => {
                format!("Invalid speech response: {}", reason)
            }
        }
    }
}

impl fmt::Display for SpeechError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SpeechError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SpeechError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_error_codes() {
        assert_eq!(
            SpeechError::Transport {
                reason: "reset".to_string()
            }
            .code(),
            3001
        );
        assert_eq!(SpeechError::RateLimited { retry_after_ms: 10 }.code(), 3002);
        assert_eq!(
            SpeechError::ProviderFailure {
                status: 500,
                reason: "boom".to_string()
            }
            .code(),
            3003
        );
        assert_eq!(
            SpeechError::InvalidResponse {
                reason: "empty".to_string()
            }
            .code(),
            3004
        );
    }

    #[test]
    fn test_rate_limited_message_mentions_delay() {
        let err = SpeechError::RateLimited {
            retry_after_ms: 8000,
        };
        assert!(err.message().contains("8000 ms"));
        assert!(format!("{}", err).contains("code 3002"));
    }
}
