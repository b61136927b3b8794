//! Speech-synthesis provider boundary
//!
//! Providers answer with audio, a rate limit, or a failure. Whatever shape
//! the remote service uses for its rate-limit hint is decoded here, once,
//! into [`SpeechOutcome`] so nothing downstream inspects raw payloads.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{log_speech_error, SpeechError};

/// Longest backoff a provider hint can impose
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Result of one synthesis request
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechOutcome {
    Audio(Vec<u8>),
    RateLimited { retry_after: Option<Duration> },
    Failed { reason: String },
}

impl SpeechOutcome {
    /// Decode an HTTP response into an outcome
    ///
    /// Rate-limit hints are read from the `Retry-After` header (seconds),
    /// then a JSON `retry_after_seconds` / `retryAfter` field, then a JSON
    /// `next_allowed_in_ms` / `nextAllowedInMs` field. A 2xx JSON body that
    /// carries one of those hints is a rate limit in disguise.
    pub fn from_http_parts(status: u16, retry_after_header: Option<&str>, body: &[u8]) -> Self {
        let body_hint = serde_json::from_slice::<RateLimitBody>(body)
            .ok()
            .and_then(|b| b.retry_after());
        let header_hint = retry_after_header
            .and_then(|v| v.trim().parse::<f64>().ok())
            .and_then(seconds_to_duration);

        match status {
            429 => SpeechOutcome::RateLimited {
                retry_after: header_hint.or(body_hint),
            },
            200..=299 if body_hint.is_some() => SpeechOutcome::RateLimited {
                retry_after: body_hint,
            },
            200..=299 if body.is_empty() => SpeechError::InvalidResponse {
                reason: "empty audio body".to_string(),
            }
            .into(),
            200..=299 => SpeechOutcome::Audio(body.to_vec()),
            _ => SpeechError::ProviderFailure {
                status,
                reason: String::from_utf8_lossy(&body[..body.len().min(200)]).into_owned(),
            }
            .into(),
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, SpeechOutcome::Audio(_))
    }
}

impl From<SpeechError> for SpeechOutcome {
    fn from(err: SpeechError) -> Self {
        match err {
            SpeechError::RateLimited { retry_after_ms } => SpeechOutcome::RateLimited {
                retry_after: Some(Duration::from_millis(retry_after_ms).min(MAX_RETRY_AFTER)),
            },
            other => SpeechOutcome::Failed {
                reason: other.to_string(),
            },
        }
    }
}

/// Rate-limit fields seen in provider error bodies
#[derive(Debug, Default, Deserialize)]
struct RateLimitBody {
    #[serde(default, alias = "retryAfter")]
    retry_after_seconds: Option<f64>,
    #[serde(default, alias = "nextAllowedInMs")]
    next_allowed_in_ms: Option<f64>,
}

impl RateLimitBody {
    fn retry_after(&self) -> Option<Duration> {
        self.retry_after_seconds
            .and_then(seconds_to_duration)
            .or_else(|| self.next_allowed_in_ms.and_then(|ms| seconds_to_duration(ms / 1000.0)))
    }
}

/// Hints beyond [`MAX_RETRY_AFTER`] are clamped; negative or NaN hints are dropped
fn seconds_to_duration(seconds: f64) -> Option<Duration> {
    if seconds.is_nan() || seconds < 0.0 {
        return None;
    }
    Some(
        Duration::try_from_secs_f64(seconds)
            .map_or(MAX_RETRY_AFTER, |wait| wait.min(MAX_RETRY_AFTER)),
    )
}

/// Text-to-speech collaborator
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn synthesize(&self, text: &str) -> SpeechOutcome;

    fn name(&self) -> &'static str {
        "speech"
    }
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
}

/// Posts `{ "text": ... }` to an HTTP endpoint and expects audio bytes back
#[derive(Debug, Clone)]
pub struct HttpSpeechProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSpeechProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SpeechProvider for HttpSpeechProvider {
    async fn synthesize(&self, text: &str) -> SpeechOutcome {
        let response = match self
            .client
            .post(&self.endpoint)
            .json(&SynthesisRequest { text })
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let err = SpeechError::Transport {
                    reason: err.to_string(),
                };
                log_speech_error(&err, "HttpSpeechProvider::synthesize");
                return err.into();
            }
        };

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        match response.bytes().await {
            Ok(body) => SpeechOutcome::from_http_parts(status, retry_after.as_deref(), &body),
            Err(err) => {
                let err = SpeechError::Transport {
                    reason: err.to_string(),
                };
                log_speech_error(&err, "HttpSpeechProvider::synthesize");
                err.into()
            }
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_is_audio() {
        let outcome = SpeechOutcome::from_http_parts(200, None, &[1, 2, 3]);
        assert_eq!(outcome, SpeechOutcome::Audio(vec![1, 2, 3]));
    }

    #[test]
    fn test_429_prefers_header() {
        let outcome = SpeechOutcome::from_http_parts(429, Some("3"), br#"{"retry_after_seconds": 10}"#);
        assert_eq!(
            outcome,
            SpeechOutcome::RateLimited {
                retry_after: Some(Duration::from_secs(3))
            }
        );
    }

    #[test]
    fn test_429_reads_camel_case_body() {
        let outcome = SpeechOutcome::from_http_parts(429, None, br#"{"retryAfter": 2.5}"#);
        assert_eq!(
            outcome,
            SpeechOutcome::RateLimited {
                retry_after: Some(Duration::from_millis(2500))
            }
        );

        let outcome = SpeechOutcome::from_http_parts(429, None, br#"{"nextAllowedInMs": 1200}"#);
        assert_eq!(
            outcome,
            SpeechOutcome::RateLimited {
                retry_after: Some(Duration::from_millis(1200))
            }
        );
    }

    #[test]
    fn test_429_without_hint() {
        let outcome = SpeechOutcome::from_http_parts(429, Some("soon"), b"slow down");
        assert_eq!(outcome, SpeechOutcome::RateLimited { retry_after: None });
    }

    #[test]
    fn test_ok_status_with_hint_is_rate_limit() {
        let outcome =
            SpeechOutcome::from_http_parts(200, None, br#"{"error": "quota", "next_allowed_in_ms": 4000}"#);
        assert_eq!(
            outcome,
            SpeechOutcome::RateLimited {
                retry_after: Some(Duration::from_secs(4))
            }
        );
    }

    #[test]
    fn test_server_error_is_failure() {
        match SpeechOutcome::from_http_parts(500, None, b"boom") {
            SpeechOutcome::Failed { reason } => {
                assert!(reason.contains("500"));
                assert!(reason.contains("boom"));
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_body_is_failure() {
        assert!(matches!(
            SpeechOutcome::from_http_parts(204, None, b""),
            SpeechOutcome::Failed { .. }
        ));
    }

    #[test]
    fn test_negative_hint_ignored() {
        let outcome = SpeechOutcome::from_http_parts(429, Some("-5"), b"");
        assert_eq!(outcome, SpeechOutcome::RateLimited { retry_after: None });
    }

    #[test]
    fn test_huge_header_hint_is_clamped() {
        let outcome = SpeechOutcome::from_http_parts(429, Some("1e20"), b"");
        assert_eq!(
            outcome,
            SpeechOutcome::RateLimited {
                retry_after: Some(MAX_RETRY_AFTER)
            }
        );
    }

    #[test]
    fn test_huge_body_hint_is_clamped() {
        let outcome = SpeechOutcome::from_http_parts(429, None, br#"{"retry_after_seconds": 1e19}"#);
        assert_eq!(
            outcome,
            SpeechOutcome::RateLimited {
                retry_after: Some(MAX_RETRY_AFTER)
            }
        );

        let outcome = SpeechOutcome::from_http_parts(429, Some("inf"), b"");
        assert_eq!(
            outcome,
            SpeechOutcome::RateLimited {
                retry_after: Some(MAX_RETRY_AFTER)
            }
        );
    }
}
