//! SessionRunner: drives a [`CoachingSession`] from an async pose source.
//!
//! Frames are processed as they arrive. A fixed tick applies speech
//! settlements even while no frames come in, so provider backoff takes
//! effect before the next cue is considered. Rep events fan out over a
//! broadcast channel and the latest snapshot is published on a watch
//! channel for status displays.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::clock::{TimeSource, TokioTimeSource};
use super::session::{CoachingSession, SessionSnapshot};
use crate::analysis::RepEvent;
use crate::fixtures::PoseRecording;
use crate::pose::PoseFrame;
use crate::speech::SpeechDispatcher;
use crate::telemetry;

/// Anything that yields pose frames; `None` ends the session
#[async_trait]
pub trait PoseSource: Send {
    async fn next_frame(&mut self) -> Option<PoseFrame>;
}

#[async_trait]
impl PoseSource for mpsc::Receiver<PoseFrame> {
    async fn next_frame(&mut self) -> Option<PoseFrame> {
        self.recv().await
    }
}

/// Plays a recording back at its captured pace
pub struct RecordingSource {
    frames: VecDeque<(u64, PoseFrame)>,
    started: Option<tokio::time::Instant>,
}

impl RecordingSource {
    pub fn new(recording: PoseRecording) -> Self {
        let timestamps: Vec<u64> = (0..recording.frames.len())
            .map(|i| recording.timestamp_ms(i))
            .collect();
        Self {
            frames: timestamps.into_iter().zip(recording.frames).collect(),
            started: None,
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

#[async_trait]
impl PoseSource for RecordingSource {
    async fn next_frame(&mut self) -> Option<PoseFrame> {
        let t_ms = self.frames.front()?.0;
        let started = *self.started.get_or_insert_with(tokio::time::Instant::now);
        // The frame stays queued until the sleep completes, so a cancelled
        // call loses nothing
        tokio::time::sleep_until(started + Duration::from_millis(t_ms)).await;
        self.frames.pop_front().map(|(_, frame)| frame)
    }
}

/// Totals for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub rep_count: u32,
    pub cues_requested: u64,
    pub cues_dispatched: u64,
    pub final_snapshot: SessionSnapshot,
}

pub struct SessionRunner {
    session: CoachingSession,
    speech: Option<SpeechDispatcher>,
    clock: Arc<dyn TimeSource>,
    tick: Duration,
    rep_tx: broadcast::Sender<RepEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    summary: RunSummary,
}

impl SessionRunner {
    pub fn new(session: CoachingSession) -> Self {
        let tick = session.config().session.tick_interval();
        let (rep_tx, _) = broadcast::channel(32);
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::default());
        Self {
            session,
            speech: None,
            clock: Arc::new(TokioTimeSource),
            tick,
            rep_tx,
            snapshot_tx,
            summary: RunSummary::default(),
        }
    }

    pub fn with_speech(mut self, dispatcher: SpeechDispatcher) -> Self {
        self.speech = Some(dispatcher);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn session(&self) -> &CoachingSession {
        &self.session
    }

    pub fn speech(&self) -> Option<&SpeechDispatcher> {
        self.speech.as_ref()
    }

    pub fn subscribe_reps(&self) -> broadcast::Receiver<RepEvent> {
        self.rep_tx.subscribe()
    }

    pub fn watch_snapshots(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Run until the source is exhausted
    pub async fn run<S: PoseSource>(&mut self, source: S) -> RunSummary {
        self.run_until(source, std::future::pending::<()>()).await
    }

    /// Run until the source is exhausted or `shutdown` resolves
    pub async fn run_until<S, F>(&mut self, mut source: S, shutdown: F) -> RunSummary
    where
        S: PoseSource,
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.tick.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(exercise = %self.session.spec().exercise, "coaching session started");
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                frame = source.next_frame() => match frame {
                    Some(frame) => self.step(&frame),
                    None => {
                        debug!("pose source exhausted");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if let Some(speech) = self.speech.as_mut() {
                        speech.poll_settled(self.clock.now());
                    }
                }
            }
        }

        self.summary.rep_count = self.session.rep_count();
        self.summary.final_snapshot = self.session.snapshot();
        info!(
            frames = self.summary.frames,
            reps = self.summary.rep_count,
            cues = self.summary.cues_dispatched,
            "coaching session ended"
        );
        self.summary.clone()
    }

    fn step(&mut self, frame: &PoseFrame) {
        let now = self.clock.now();
        let effects = match self.speech.as_mut() {
            Some(speech) => {
                speech.poll_settled(now);
                self.session.on_frame_with(frame, now, &*speech)
            }
            None => self.session.on_frame(frame, now),
        };
        self.summary.frames += 1;

        let hub = telemetry::hub();
        if let Some(baseline) = effects.calibrated {
            info!(baseline, "calibration complete");
            hub.record_calibration(baseline);
        }
        if let Some(rep) = effects.rep_event {
            hub.record_rep(rep.count);
            let _ = self.rep_tx.send(rep);
        }
        if let Some(request) = &effects.speech {
            self.summary.cues_requested += 1;
            match &self.speech {
                Some(speech) => {
                    if speech.dispatch(request) {
                        self.summary.cues_dispatched += 1;
                    }
                }
                None => debug!(issue = %request.issue_id, text = %request.text, "cue (no speech provider)"),
            }
        }

        self.snapshot_tx.send_replace(self.session.snapshot());
    }
}
