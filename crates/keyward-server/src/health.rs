//! `/api/ping` liveness endpoint payload.

use serde::Serialize;
use std::time::Instant;

/// Liveness response body.
#[derive(Debug, Clone, Serialize)]
pub struct PingResponse {
    /// Always `"alive"` while the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Currently open WebSocket connections.
    pub connections: usize,
}

/// Build a liveness response from live counters.
pub fn ping_response(start_time: Instant, connections: usize) -> PingResponse {
    PingResponse {
        status: "alive".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
    }
}
