//! SpeechDispatcher - single-flight, backoff-aware speech requests
//!
//! At most one synthesis request runs at a time. The in-flight flag is set
//! before the request task is spawned and cleared by a drop guard when the
//! task ends, whatever the outcome. Settlements come back over an mpsc
//! channel and are applied by [`SpeechDispatcher::poll_settled`] on the
//! session tick, so backoff state is only ever touched from that tick.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::provider::{HttpSpeechProvider, SpeechOutcome, SpeechProvider, MAX_RETRY_AFTER};
use crate::config::SpeechConfig;
use crate::error::{log_speech_error, SpeechError};
use crate::feedback::{SpeechReadiness, SpeechRequest};
use crate::telemetry::{self, DiagnosticError, SpeechSettlement};

/// Audio produced for a spoken phrase
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedSpeech {
    pub text: String,
    pub audio: Vec<u8>,
}

#[derive(Debug)]
enum Settled {
    Spoken,
    RateLimited(Option<Duration>),
    Failed(String),
}

#[derive(Debug)]
struct Settlement {
    text: String,
    result: Settled,
    elapsed: Duration,
}

/// Clears the in-flight flag when the request task ends
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SpeechDispatcher {
    provider: Arc<dyn SpeechProvider>,
    in_flight: Arc<AtomicBool>,
    settled_tx: mpsc::UnboundedSender<Settlement>,
    settled_rx: mpsc::UnboundedReceiver<Settlement>,
    audio_tx: broadcast::Sender<SynthesizedSpeech>,
    global_not_before: Option<Instant>,
    phrase_not_before: HashMap<String, Instant>,
    fallback_backoff: Duration,
}

impl SpeechDispatcher {
    pub fn new(provider: Arc<dyn SpeechProvider>, config: &SpeechConfig) -> Self {
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        let (audio_tx, _) = broadcast::channel(16);
        Self {
            provider,
            in_flight: Arc::new(AtomicBool::new(false)),
            settled_tx,
            settled_rx,
            audio_tx,
            global_not_before: None,
            phrase_not_before: HashMap::new(),
            fallback_backoff: config.fallback_backoff(),
        }
    }

    /// HTTP-backed dispatcher, or `None` when no endpoint is configured
    pub fn from_config(config: &SpeechConfig) -> Option<Self> {
        let endpoint = config.endpoint.as_ref()?;
        info!(endpoint = %endpoint, "speech provider configured");
        Some(Self::new(Arc::new(HttpSpeechProvider::new(endpoint.clone())), config))
    }

    pub fn subscribe_audio(&self) -> broadcast::Receiver<SynthesizedSpeech> {
        self.audio_tx.subscribe()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start synthesizing `request`
    ///
    /// Returns `false` when a request is already in flight or no tokio
    /// runtime is available. Must be called from within a runtime context.
    pub fn dispatch(&self, request: &SpeechRequest) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(issue = %request.issue_id, "speech already in flight, skipping");
            return false;
        }
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(err) => {
                warn!(error = %err, "no runtime for speech request");
                return false;
            }
        };

        telemetry::hub().record_speech_request(&request.issue_id, request.forced);

        let provider = Arc::clone(&self.provider);
        let settled_tx = self.settled_tx.clone();
        let audio_tx = self.audio_tx.clone();
        let text = request.text.clone();

        handle.spawn(async move {
            let started = Instant::now();
            let outcome = provider.synthesize(&text).await;
            let result = match outcome {
                SpeechOutcome::Audio(audio) => {
                    let _ = audio_tx.send(SynthesizedSpeech {
                        text: text.clone(),
                        audio,
                    });
                    Settled::Spoken
                }
                SpeechOutcome::RateLimited { retry_after } => Settled::RateLimited(retry_after),
                SpeechOutcome::Failed { reason } => Settled::Failed(reason),
            };

            // Settlement is queued before the flag clears, so a tick that
            // sees the dispatcher idle has the backoff available to apply.
            let _ = settled_tx.send(Settlement {
                text,
                result,
                elapsed: started.elapsed(),
            });
            drop(guard);
        });

        true
    }

    /// Apply every settlement received since the last call
    pub fn poll_settled(&mut self, now: Instant) -> usize {
        let mut applied = 0;
        while let Ok(settlement) = self.settled_rx.try_recv() {
            self.apply(settlement, now);
            applied += 1;
        }
        self.phrase_not_before.retain(|_, until| *until > now);
        applied
    }

    /// Earliest instant any request may start
    pub fn global_not_before(&self) -> Option<Instant> {
        self.global_not_before
    }

    fn apply(&mut self, settlement: Settlement, now: Instant) {
        let hub = telemetry::hub();
        match settlement.result {
            Settled::Spoken => {
                debug!(text = %settlement.text, elapsed_ms = settlement.elapsed.as_millis() as u64, "speech delivered");
                hub.record_speech_settled(SpeechSettlement::Spoken, settlement.elapsed, None);
            }
            Settled::RateLimited(hint) => {
                let wait = hint.unwrap_or(self.fallback_backoff).min(MAX_RETRY_AFTER);
                let until = now.checked_add(wait).unwrap_or(now);
                self.global_not_before = Some(self.global_not_before.map_or(until, |t| t.max(until)));
                self.phrase_not_before.insert(settlement.text.clone(), until);

                log_speech_error(
                    &SpeechError::RateLimited {
                        retry_after_ms: wait.as_millis() as u64,
                    },
                    "SpeechDispatcher::poll_settled",
                );
                hub.record_speech_settled(SpeechSettlement::RateLimited, settlement.elapsed, Some(wait));
            }
            Settled::Failed(reason) => {
                warn!(text = %settlement.text, reason = %reason, "speech request failed");
                hub.record_speech_settled(SpeechSettlement::Failed, settlement.elapsed, None);
                hub.record_error(DiagnosticError::SpeechProvider, reason);
            }
        }
    }
}

impl SpeechReadiness for SpeechDispatcher {
    fn is_ready(&self, text: &str, now: Instant) -> bool {
        if self.is_in_flight() {
            return false;
        }
        if self.global_not_before.is_some_and(|t| now < t) {
            return false;
        }
        !self.phrase_not_before.get(text).is_some_and(|t| now < *t)
    }
}
