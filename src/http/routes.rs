use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::header::{HeaderName, AUTHORIZATION};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

use crate::analysis::RepEvent;
use crate::engine::{SessionRunner, SessionSnapshot};
use crate::telemetry::{self, TelemetrySnapshot};

use super::sse;

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct DebugHttpState {
    exercise: Arc<String>,
    snapshots: watch::Receiver<SessionSnapshot>,
    reps: Arc<broadcast::Receiver<RepEvent>>,
    token: Arc<String>,
    started: Instant,
}

impl DebugHttpState {
    pub fn new(
        exercise: impl Into<String>,
        snapshots: watch::Receiver<SessionSnapshot>,
        reps: broadcast::Receiver<RepEvent>,
        token: String,
    ) -> Self {
        Self {
            exercise: Arc::new(exercise.into()),
            snapshots,
            reps: Arc::new(reps),
            token: Arc::new(token),
            started: Instant::now(),
        }
    }

    pub fn from_runner(runner: &SessionRunner, token: String) -> Self {
        Self::new(
            runner.session().spec().exercise.clone(),
            runner.watch_snapshots(),
            runner.subscribe_reps(),
            token,
        )
    }

    pub(super) fn subscribe_reps(&self) -> broadcast::Receiver<RepEvent> {
        self.reps.resubscribe()
    }

    fn authorize(
        &self,
        headers: &HeaderMap,
        query_token: Option<&str>,
    ) -> Result<(), HttpServerError> {
        let provided = extract_token(headers, query_token);
        match provided {
            Some(value) if value == *self.token => Ok(()),
            _ => Err(HttpServerError::Unauthorized),
        }
    }
}

/// Query payload for extracting token from URL.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub token: Option<String>,
}

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum HttpServerError {
    Unauthorized,
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "missing or invalid token"),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Health endpoint response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub exercise: String,
    pub uptime_ms: u64,
    pub calibrated: bool,
    pub rep_count: u32,
}

/// Telemetry endpoint response payload.
#[derive(Debug, Serialize)]
pub struct TelemetryResponse {
    pub latest_rep: Option<u32>,
    pub diagnostics: TelemetrySnapshot,
}

/// Build the Axum router with all handlers.
pub fn build_router(state: DebugHttpState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/telemetry", get(telemetry_handler))
        .route("/rep-stream", get(rep_stream_handler))
        .route("/telemetry-stream", get(telemetry_stream_handler))
        .with_state(state)
}

/// Run the HTTP server loop.
pub async fn run_http_server(state: DebugHttpState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding debug HTTP listener")?;
    let router = build_router(state);
    axum::serve(listener, router)
        .await
        .context("serving debug HTTP router")?;
    Ok(())
}

pub async fn health(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<HealthResponse>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;

    let snapshot = state.snapshots.borrow().clone();
    Ok(Json(HealthResponse {
        status: "ok",
        exercise: state.exercise.to_string(),
        uptime_ms: state.started.elapsed().as_millis() as u64,
        calibrated: snapshot.baseline.is_some(),
        rep_count: snapshot.rep_count,
    }))
}

pub async fn status(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<SessionSnapshot>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    let snapshot = state.snapshots.borrow().clone();
    Ok(Json(snapshot))
}

pub async fn telemetry_handler(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<TelemetryResponse>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;

    let rep_count = state.snapshots.borrow().rep_count;
    Ok(Json(TelemetryResponse {
        latest_rep: (rep_count > 0).then_some(rep_count),
        diagnostics: telemetry::hub().snapshot(),
    }))
}

pub async fn rep_stream_handler(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<sse::EventStream, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    Ok(sse::reps(state.subscribe_reps()))
}

pub async fn telemetry_stream_handler(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<sse::EventStream, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    Ok(sse::telemetry(telemetry::hub().collector().subscribe()))
}

fn extract_token(headers: &HeaderMap, query_token: Option<&str>) -> Option<String> {
    if let Some(token) = query_token {
        return Some(token.to_string());
    }

    static X_DEBUG_TOKEN: HeaderName = HeaderName::from_static("x-debug-token");

    headers
        .get(&X_DEBUG_TOKEN)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| raw.strip_prefix("Bearer ").map(|v| v.to_string()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use crate::engine::SessionStatus;
    use tower::ServiceExt;

    const TOKEN: &str = "smoke-token";

    fn make_router(snapshot: SessionSnapshot) -> Router {
        let (_snapshot_tx, snapshots) = watch::channel(snapshot);
        let (_rep_tx, reps) = broadcast::channel(4);
        build_router(DebugHttpState::new(
            "squat",
            snapshots,
            reps,
            TOKEN.to_string(),
        ))
    }

    async fn get_json(router: Router, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, Value) {
        let mut request = Request::builder().uri(uri);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = router
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_requires_token() {
        let (status, json) = get_json(make_router(SessionSnapshot::default()), "/health", &[]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "missing or invalid token");
    }

    #[tokio::test]
    async fn health_accepts_query_header_or_bearer() {
        let uri = format!("/health?token={TOKEN}");
        let (status, json) = get_json(make_router(SessionSnapshot::default()), &uri, &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["exercise"], "squat");
        assert_eq!(json["calibrated"], false);

        let (status, _) = get_json(
            make_router(SessionSnapshot::default()),
            "/health",
            &[("x-debug-token", TOKEN)],
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let bearer = format!("Bearer {TOKEN}");
        let (status, _) = get_json(
            make_router(SessionSnapshot::default()),
            "/health",
            &[("authorization", bearer.as_str())],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn health_reports_calibrated_while_body_is_lost() {
        let snapshot = SessionSnapshot {
            status: SessionStatus::WaitingForBody,
            baseline: Some(300.0),
            ..Default::default()
        };
        let uri = format!("/health?token={TOKEN}");
        let (status, json) = get_json(make_router(snapshot), &uri, &[]).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["calibrated"], true);
    }

    #[tokio::test]
    async fn status_reports_snapshot() {
        let snapshot = SessionSnapshot {
            status: SessionStatus::Coaching {
                message: "Good form".to_string(),
            },
            rep_count: 4,
            ..Default::default()
        };
        let uri = format!("/status?token={TOKEN}");
        let (status, json) = get_json(make_router(snapshot), &uri, &[]).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["rep_count"], 4);
        assert_eq!(json["status"]["state"], "coaching");
        assert_eq!(json["status"]["message"], "Good form");
    }

    #[tokio::test]
    async fn telemetry_includes_diagnostics() {
        telemetry::hub().record_rep(1);
        let uri = format!("/telemetry?token={TOKEN}");
        let (status, json) = get_json(make_router(SessionSnapshot::default()), &uri, &[]).await;

        assert_eq!(status, StatusCode::OK);
        assert!(json["latest_rep"].is_null());
        assert!(json["diagnostics"]["recent"].is_array());
    }

    #[tokio::test]
    async fn rep_stream_requires_token() {
        let response = make_router(SessionSnapshot::default())
            .oneshot(Request::builder().uri("/rep-stream").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
