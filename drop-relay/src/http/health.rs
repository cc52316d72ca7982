//! Health check endpoint.

use crate::ledger::{TransferLedger, TransferStatus};
use crate::server::Relay;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Global start time for uptime calculation.
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call once at startup).
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

/// Health status response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// `ok`, or `degraded` when the ledger cannot be queried.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Number of live connections bound to a passcode.
    pub connections: usize,
    /// Number of active passcode sessions.
    pub sessions: usize,
    /// Transfers currently in progress, if the ledger answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfers_in_progress: Option<u64>,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Health check handler.
///
/// The in-progress count doubles as a liveness probe for the ledger: a
/// failing query degrades the reported status instead of erroring the
/// endpoint.
pub async fn health_handler(Extension(relay): Extension<Arc<Relay>>) -> Json<HealthStatus> {
    let uptime = START_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0);

    let transfers_in_progress = match relay
        .ledger()
        .count_by_status(TransferStatus::InProgress)
        .await
    {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!("ledger probe failed: {}", e);
            None
        }
    };

    let status = if transfers_in_progress.is_some() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections: relay.total_connections(),
        sessions: relay.total_sessions(),
        transfers_in_progress,
        uptime_seconds: uptime,
    })
}
