//! Liveness endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::{Json, Router, routing};
use serde::{Deserialize, Serialize};

use crate::state::ServiceState;

/// Routes of the health check, with and without trailing slash.
pub fn router() -> Router<ServiceState> {
    Router::new()
        .route("/health/", routing::get(health))
        .route("/health", routing::get(health))
}

/// Body of the health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"healthy"`.
    pub status: String,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
}

/// Wall-clock timestamps that never go backwards.
///
/// If the system clock is adjusted backwards, the last returned timestamp is repeated until the
/// clock catches up.
#[derive(Debug, Default)]
pub struct HealthClock {
    last: AtomicU64,
}

impl HealthClock {
    /// Returns the current time in seconds since the Unix epoch.
    pub fn now(&self) -> f64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64());

        // Non-negative floats order the same way as their bit patterns.
        let previous = self.last.fetch_max(now.to_bits(), Ordering::Relaxed);
        f64::from_bits(previous).max(now)
    }
}

async fn health(State(state): State<ServiceState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_owned(),
        timestamp: state.health.now(),
    })
}
