//! Debug HTTP server surfaced only in `debug_http` feature builds.
//!
//! Exposes health, the live session snapshot, telemetry, and SSE streams
//! of reps and telemetry events for diagnostics. Every endpoint requires
//! the debug token (query `?token=`, `x-debug-token` or a bearer header).

#[cfg(feature = "debug_http")]
mod routes;
#[cfg(feature = "debug_http")]
mod sse;

#[cfg(feature = "debug_http")]
pub use routes::{build_router, run_http_server, DebugHttpState, HttpServerError};

use std::net::SocketAddr;

use crate::engine::SessionRunner;

pub const ADDR_ENV: &str = "SQUAT_COACH_DEBUG_HTTP_ADDR";
pub const TOKEN_ENV: &str = "SQUAT_COACH_DEBUG_TOKEN";
const DEFAULT_TOKEN: &str = "coach-debug";

/// Bind address from the environment, defaulting to loopback:8787.
pub fn addr_from_env() -> SocketAddr {
    std::env::var(ADDR_ENV)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8787)))
}

pub fn token_from_env() -> String {
    std::env::var(TOKEN_ENV).unwrap_or_else(|_| DEFAULT_TOKEN.to_string())
}

/// Serve the runner's state on the current tokio runtime.
///
/// Returns `false` when the server is compiled out.
#[cfg(feature = "debug_http")]
pub fn spawn_if_enabled(runner: &SessionRunner, addr: SocketAddr, token: String) -> bool {
    let preview = token.chars().take(4).collect::<String>();
    let state = DebugHttpState::from_runner(runner, token);

    log::info!(
        "Debug HTTP server binding {} (token prefix {}***)",
        addr,
        preview
    );
    tokio::spawn(async move {
        if let Err(err) = run_http_server(state, addr).await {
            log::error!("Debug HTTP server stopped: {:#}", err);
        }
    });
    true
}

#[cfg(not(feature = "debug_http"))]
pub fn spawn_if_enabled(_runner: &SessionRunner, _addr: SocketAddr, _token: String) -> bool {
    log::warn!("Debug HTTP server not compiled in (enable the `debug_http` feature)");
    false
}
