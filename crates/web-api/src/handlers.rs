use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Startup facts served by the liveness endpoint. Never changes after launch.
#[derive(Debug, Clone)]
pub struct LivenessState {
    pub instrument: String,
    pub started_at: DateTime<Utc>,
    pub version: &'static str,
}

impl LivenessState {
    #[must_use]
    pub fn new(instrument: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    fn uptime_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds().max(0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub instrument: String,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
}

/// GET / - plain-text liveness probe.
pub async fn root() -> &'static str {
    "OK"
}

/// GET /health - process facts as JSON.
pub async fn health(State(state): State<Arc<LivenessState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        instrument: state.instrument.clone(),
        version: state.version,
        started_at: state.started_at,
        uptime_secs: state.uptime_secs(Utc::now()),
    })
}
