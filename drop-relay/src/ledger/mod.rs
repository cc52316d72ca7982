//! Transfer ledger for passdrop-relay.
//!
//! Persists passcode session records and the lifecycle status of each file
//! transfer the relay observes.

mod sqlite;

pub use sqlite::SqliteLedger;

use crate::error::LedgerError;
use async_trait::async_trait;
use drop_types::{Passcode, TransferId};
use std::fmt;

/// Lifecycle status of a file transfer.
///
/// `Completed` and `Failed` are terminal; the ledger never mutates a record
/// once it has left `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    /// The transfer has been initiated and chunks may still be in flight.
    InProgress,
    /// The final chunk was observed being forwarded.
    Completed,
    /// No target connections existed when the transfer was initiated.
    Failed,
}

impl TransferStatus {
    /// Stable string form used in the database and over HTTP.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::InProgress => "in_progress",
            TransferStatus::Completed => "completed",
            TransferStatus::Failed => "failed",
        }
    }

    /// Parse the stable string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "in_progress" => Some(TransferStatus::InProgress),
            "completed" => Some(TransferStatus::Completed),
            "failed" => Some(TransferStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file-relay attempt as recorded in the ledger.
#[derive(Debug, Clone)]
pub struct Transfer {
    /// Unique identifier, assigned at initiation.
    pub id: TransferId,
    /// Name of the file being relayed.
    pub file_name: String,
    /// Total file size in bytes.
    pub file_size: u64,
    /// Number of chunks the sender declared.
    pub total_chunks: u32,
    /// MIME type, if the sender supplied one.
    pub file_type: Option<String>,
    /// Passcode whose session carries the transfer.
    pub passcode: Passcode,
    /// Current lifecycle status.
    pub status: TransferStatus,
}

/// Fields required to record a new transfer.
#[derive(Debug, Clone)]
pub struct NewTransfer {
    /// Unique identifier, assigned at initiation.
    pub id: TransferId,
    /// Name of the file being relayed.
    pub file_name: String,
    /// Total file size in bytes.
    pub file_size: u64,
    /// Number of chunks the sender declared.
    pub total_chunks: u32,
    /// MIME type, if the sender supplied one.
    pub file_type: Option<String>,
    /// Passcode whose session carries the transfer.
    pub passcode: Passcode,
}

/// Trait for transfer ledger backends.
///
/// The relay core never caches ledger state across messages; every decision
/// that needs persisted state goes through this contract.
#[async_trait]
pub trait TransferLedger: Send + Sync {
    /// Record a freshly minted passcode session.
    async fn create_passcode(&self, passcode: &Passcode) -> Result<(), LedgerError>;

    /// Whether a session record exists for the passcode.
    async fn passcode_exists(&self, passcode: &Passcode) -> Result<bool, LedgerError>;

    /// Record a new transfer with status `in_progress`.
    async fn create_transfer(&self, transfer: NewTransfer) -> Result<Transfer, LedgerError>;

    /// Move a transfer to a new status.
    ///
    /// Only applies while the record is still `in_progress`; updates against
    /// a terminal record are silently ignored.
    async fn update_status(
        &self,
        id: &TransferId,
        status: TransferStatus,
    ) -> Result<(), LedgerError>;

    /// Read a transfer record, if present.
    async fn read_transfer(&self, id: &TransferId) -> Result<Option<Transfer>, LedgerError>;

    /// Count transfers currently in the given status.
    async fn count_by_status(&self, status: TransferStatus) -> Result<u64, LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_string_roundtrip() {
        for status in [
            TransferStatus::InProgress,
            TransferStatus::Completed,
            TransferStatus::Failed,
        ] {
            assert_eq!(TransferStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TransferStatus::parse("exploded"), None);
    }
}
