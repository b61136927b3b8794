use std::convert::Infallible;
use std::pin::Pin;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::analysis::RepEvent;
use crate::telemetry::MetricEvent;

pub type EventStream = Sse<Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>>;

/// Server-Sent Events stream of counted reps.
pub fn reps(receiver: broadcast::Receiver<RepEvent>) -> EventStream {
    json_events(receiver, "rep")
}

/// Server-Sent Events stream of telemetry events.
pub fn telemetry(receiver: broadcast::Receiver<MetricEvent>) -> EventStream {
    json_events(receiver, "telemetry")
}

fn json_events<T>(receiver: broadcast::Receiver<T>, name: &'static str) -> EventStream
where
    T: Serialize + Clone + Send + 'static,
{
    // Lagged receivers skip what they missed
    let stream = BroadcastStream::new(receiver).filter_map(move |item| async move {
        match item {
            Ok(value) => match serde_json::to_string(&value) {
                Ok(payload) => Some(Ok(Event::default().event(name).data(payload))),
                Err(_) => None,
            },
            Err(_) => None,
        }
    });

    Sse::new(Box::pin(stream) as Pin<Box<_>>).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(5))
            .text("coach-keepalive"),
    )
}
