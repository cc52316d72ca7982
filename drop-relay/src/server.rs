//! Central Relay coordination.
//!
//! `Relay` owns the configuration, the connection registry, the transfer
//! ledger, and the operational metrics. Sessions and HTTP handlers share it
//! behind an `Arc`.

use crate::config::Config;
use crate::ledger::SqliteLedger;
use crate::registry::ConnectionRegistry;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
/// Thread-safe via `AtomicU64` — no locks needed for incrementing.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total connections accepted.
    pub connections_total: AtomicU64,
    /// Total transfers initiated.
    pub transfers_started: AtomicU64,
    /// Total transfers observed reaching their final chunk.
    pub transfers_completed: AtomicU64,
    /// Total transfers that failed at initiation (no target connections).
    pub transfers_failed: AtomicU64,
    /// Total file chunks forwarded.
    pub chunks_relayed: AtomicU64,
    /// Total decoded payload bytes forwarded.
    pub bytes_relayed: AtomicU64,
    /// Total ERROR replies sent to peers.
    pub errors_total: AtomicU64,
}

/// Main relay server state.
pub struct Relay {
    config: Config,
    ledger: Arc<SqliteLedger>,
    registry: ConnectionRegistry,
    metrics: RelayMetrics,
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .field("sessions", &self.registry.total_sessions())
            .finish_non_exhaustive()
    }
}

impl Relay {
    /// Create a new Relay with the given config and ledger.
    pub fn new(config: Config, ledger: SqliteLedger) -> Self {
        Self {
            config,
            ledger: Arc::new(ledger),
            registry: ConnectionRegistry::new(),
            metrics: RelayMetrics::default(),
        }
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get access to the transfer ledger.
    pub fn ledger(&self) -> &SqliteLedger {
        &self.ledger
    }

    /// Get access to the connection registry.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Number of live connections bound to a passcode.
    pub fn total_connections(&self) -> usize {
        self.registry.total_connections()
    }

    /// Number of active sessions (distinct passcodes with members).
    pub fn total_sessions(&self) -> usize {
        self.registry.total_sessions()
    }
}
