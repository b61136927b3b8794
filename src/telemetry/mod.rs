//! Coaching telemetry collector and helpers.
//!
//! The collector multiplexes rep, calibration and speech events into a
//! bounded history plus an async broadcast stream.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use tokio::sync::broadcast;

pub mod events;

pub use events::{DiagnosticError, MetricEvent, SpeechSettlement};

/// Global telemetry hub shared across the crate.
static HUB: Lazy<TelemetryHub> = Lazy::new(TelemetryHub::default);

/// Access the global telemetry hub.
pub fn hub() -> &'static TelemetryHub {
    &HUB
}

/// Snapshot of collector state for HTTP/CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity: history_capacity.max(1),
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut history) = self.history.lock() {
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let recent = self
            .history
            .lock()
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default();
        TelemetrySnapshot {
            recent,
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Rolling window of speech round-trip times.
struct LatencyTracker {
    samples: VecDeque<f32>,
    max_samples: usize,
}

impl LatencyTracker {
    fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
        }
    }

    fn observe(&mut self, value: f32) -> (f32, f32, usize) {
        if self.samples.len() == self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(value.abs());

        let count = self.samples.len();
        let sum: f32 = self.samples.iter().copied().sum();
        let max = self.samples.iter().copied().fold(0.0_f32, f32::max);
        (sum / count as f32, max, count)
    }
}

/// Top-level hub wrapping the collector plus the speech latency gauge.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    latency: Mutex<LatencyTracker>,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize, latency_window: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
            latency: Mutex::new(LatencyTracker::new(latency_window)),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.collector.snapshot()
    }

    pub fn record_calibration(&self, baseline: f64) {
        self.collector
            .publish(MetricEvent::CalibrationComplete { baseline });
    }

    pub fn record_rep(&self, count: u32) {
        self.collector.publish(MetricEvent::RepCounted {
            count,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_speech_request(&self, issue_id: &str, forced: bool) {
        self.collector.publish(MetricEvent::SpeechRequested {
            issue_id: issue_id.to_string(),
            forced,
        });
    }

    /// Settlement plus, for completed round trips, a latency sample
    pub fn record_speech_settled(
        &self,
        outcome: SpeechSettlement,
        elapsed: Duration,
        retry_after: Option<Duration>,
    ) {
        self.collector.publish(MetricEvent::SpeechSettled {
            outcome,
            retry_after_ms: retry_after.map(|d| d.as_millis() as u64),
        });

        let stats = self
            .latency
            .lock()
            .ok()
            .map(|mut tracker| tracker.observe(elapsed.as_secs_f32() * 1000.0));

        if let Some((avg, max, count)) = stats {
            self.collector.publish(MetricEvent::SpeechLatency {
                avg_ms: avg,
                max_ms: max,
                sample_count: count,
            });
        }
    }

    pub fn record_error(&self, code: DiagnosticError, context: impl Into<String>) {
        self.collector.publish(MetricEvent::Error {
            code,
            context: context.into(),
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64, 32)
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_preserves_order_within_history() {
        let collector = TelemetryCollector::new(8, 3);
        collector.publish(MetricEvent::CalibrationComplete { baseline: 300.0 });
        collector.publish(MetricEvent::RepCounted {
            count: 1,
            timestamp_ms: 10,
        });
        collector.publish(MetricEvent::SpeechRequested {
            issue_id: "depth".to_string(),
            forced: false,
        });

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 3);
        assert!(matches!(
            snapshot.recent[0],
            MetricEvent::CalibrationComplete { .. }
        ));
        assert!(matches!(
            snapshot.recent[2],
            MetricEvent::SpeechRequested { .. }
        ));
    }

    #[test]
    fn collector_drops_history_when_full() {
        let collector = TelemetryCollector::new(8, 2);
        for count in 1..=3 {
            collector.publish(MetricEvent::RepCounted {
                count,
                timestamp_ms: 0,
            });
        }

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 2);
        assert_eq!(snapshot.dropped_events, 1);
        assert!(matches!(
            snapshot.recent[0],
            MetricEvent::RepCounted { count: 2, .. }
        ));
    }

    #[test]
    fn hub_tracks_speech_latency() {
        let hub = TelemetryHub::new(8, 16, 4);
        hub.record_speech_settled(SpeechSettlement::Spoken, Duration::from_millis(100), None);
        hub.record_speech_settled(SpeechSettlement::Spoken, Duration::from_millis(300), None);

        let snapshot = hub.snapshot();
        let last_latency = snapshot
            .recent
            .iter()
            .rev()
            .find_map(|event| match event {
                MetricEvent::SpeechLatency {
                    avg_ms,
                    max_ms,
                    sample_count,
                } => Some((*avg_ms, *max_ms, *sample_count)),
                _ => None,
            })
            .unwrap();
        assert!((last_latency.0 - 200.0).abs() < 0.5);
        assert!((last_latency.1 - 300.0).abs() < 0.5);
        assert_eq!(last_latency.2, 2);
    }

    #[test]
    fn events_serialize_tagged() {
        let json = serde_json::to_value(MetricEvent::SpeechSettled {
            outcome: SpeechSettlement::RateLimited,
            retry_after_ms: Some(8000),
        })
        .unwrap();
        assert_eq!(json["type"], "speech_settled");
        assert_eq!(json["payload"]["outcome"], "rate_limited");
        assert_eq!(json["payload"]["retry_after_ms"], 8000);
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let collector = TelemetryCollector::new(8, 8);
        let mut rx = collector.subscribe();
        collector.publish(MetricEvent::RepCounted {
            count: 7,
            timestamp_ms: 0,
        });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, MetricEvent::RepCounted { count: 7, .. }));
    }
}
