//! Prometheus metrics endpoint.

use crate::ledger::{TransferLedger, TransferStatus};
use crate::server::Relay;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(relay): Extension<Arc<Relay>>) -> impl IntoResponse {
    let m = relay.metrics();

    // Gauges — current state
    let connections = relay.total_connections();
    let sessions = relay.total_sessions();

    // Counters — monotonic since startup
    let conns_total = m.connections_total.load(Ordering::Relaxed);
    let started = m.transfers_started.load(Ordering::Relaxed);
    let completed = m.transfers_completed.load(Ordering::Relaxed);
    let failed = m.transfers_failed.load(Ordering::Relaxed);
    let chunks = m.chunks_relayed.load(Ordering::Relaxed);
    let bytes = m.bytes_relayed.load(Ordering::Relaxed);
    let errors = m.errors_total.load(Ordering::Relaxed);

    // Ledger stats (async queries — best effort)
    let ledger = relay.ledger();
    let in_progress = ledger
        .count_by_status(TransferStatus::InProgress)
        .await
        .unwrap_or(0);
    let ledger_completed = ledger
        .count_by_status(TransferStatus::Completed)
        .await
        .unwrap_or(0);
    let ledger_failed = ledger
        .count_by_status(TransferStatus::Failed)
        .await
        .unwrap_or(0);

    let body = format!(
        r#"# HELP passdrop_connections_active Number of connections bound to a passcode
# TYPE passdrop_connections_active gauge
passdrop_connections_active {connections}

# HELP passdrop_sessions_active Number of active passcode sessions
# TYPE passdrop_sessions_active gauge
passdrop_sessions_active {sessions}

# HELP passdrop_info Server information
# TYPE passdrop_info gauge
passdrop_info{{version="{version}"}} 1

# HELP passdrop_connections_total Total connections accepted
# TYPE passdrop_connections_total counter
passdrop_connections_total {conns_total}

# HELP passdrop_transfers_started_total Total transfers initiated
# TYPE passdrop_transfers_started_total counter
passdrop_transfers_started_total {started}

# HELP passdrop_transfers_completed_total Total transfers completed
# TYPE passdrop_transfers_completed_total counter
passdrop_transfers_completed_total {completed}

# HELP passdrop_transfers_failed_total Total transfers failed at initiation
# TYPE passdrop_transfers_failed_total counter
passdrop_transfers_failed_total {failed}

# HELP passdrop_chunks_relayed_total Total file chunks forwarded
# TYPE passdrop_chunks_relayed_total counter
passdrop_chunks_relayed_total {chunks}

# HELP passdrop_bytes_relayed_total Total decoded payload bytes forwarded
# TYPE passdrop_bytes_relayed_total counter
passdrop_bytes_relayed_total {bytes}

# HELP passdrop_errors_total Total ERROR replies sent to peers
# TYPE passdrop_errors_total counter
passdrop_errors_total {errors}

# HELP passdrop_ledger_transfers_in_progress Transfers currently in progress
# TYPE passdrop_ledger_transfers_in_progress gauge
passdrop_ledger_transfers_in_progress {in_progress}

# HELP passdrop_ledger_transfers_completed Transfers recorded completed
# TYPE passdrop_ledger_transfers_completed gauge
passdrop_ledger_transfers_completed {ledger_completed}

# HELP passdrop_ledger_transfers_failed Transfers recorded failed
# TYPE passdrop_ledger_transfers_failed gauge
passdrop_ledger_transfers_failed {ledger_failed}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

#[cfg(test)]
mod tests {
    #[test]
    fn prometheus_format_is_valid() {
        // Verify the format strings are valid
        let sample = format!(
            "# TYPE passdrop_connections_active gauge\npassdrop_connections_active {}",
            42
        );
        assert!(sample.contains("gauge"));
        assert!(sample.contains("42"));
    }
}
