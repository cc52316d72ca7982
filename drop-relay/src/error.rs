//! Error types for passdrop-relay.
//!
//! The session loop never fails the connection, so no error type spans the
//! whole relay: the ledger has [`LedgerError`], configuration has
//! `ConfigError`, and the binary aggregates with `anyhow` at startup.

/// Transfer ledger errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be interpreted.
    #[error("corrupt ledger row: {reason}")]
    Corrupt {
        /// What was wrong with the row.
        reason: String,
    },
}
