//! SQLite transfer ledger backend.

use super::{NewTransfer, Transfer, TransferLedger, TransferStatus};
use crate::error::LedgerError;
use async_trait::async_trait;
use drop_types::{Passcode, TransferId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// SQLite-backed transfer ledger.
///
/// Uses WAL mode for concurrent reads/writes.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Open a ledger at the given database path.
    ///
    /// Creates the database file if it doesn't exist.
    pub async fn new(path: &Path) -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::from_str(path.to_str().unwrap_or("passdrop.db"))
            .map_err(LedgerError::Database)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .map_err(LedgerError::Database)?;

        let ledger = Self { pool };
        ledger.run_migrations().await?;
        Ok(ledger)
    }

    /// Create an in-memory ledger (for testing).
    pub async fn in_memory() -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::from_str(":memory:")
            .map_err(LedgerError::Database)?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(LedgerError::Database)?;

        let ledger = Self { pool };
        ledger.run_migrations().await?;
        Ok(ledger)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS passcodes (
                passcode TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(LedgerError::Database)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transfers (
                id TEXT PRIMARY KEY,
                file_name TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                total_chunks INTEGER NOT NULL,
                file_type TEXT,
                passcode TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(LedgerError::Database)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_transfers_passcode ON transfers(passcode)")
            .execute(&self.pool)
            .await
            .map_err(LedgerError::Database)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_transfers_status ON transfers(status)")
            .execute(&self.pool)
            .await
            .map_err(LedgerError::Database)?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct TransferRow {
    id: String,
    file_name: String,
    file_size: i64,
    total_chunks: i64,
    file_type: Option<String>,
    passcode: String,
    status: String,
}

impl TryFrom<TransferRow> for Transfer {
    type Error = LedgerError;

    fn try_from(row: TransferRow) -> Result<Self, Self::Error> {
        let id = TransferId::parse(&row.id).ok_or_else(|| LedgerError::Corrupt {
            reason: format!("invalid transfer id: {}", row.id),
        })?;
        let status = TransferStatus::parse(&row.status).ok_or_else(|| LedgerError::Corrupt {
            reason: format!("invalid transfer status: {}", row.status),
        })?;
        let passcode = Passcode::new(row.passcode).ok_or_else(|| LedgerError::Corrupt {
            reason: "empty passcode on transfer row".to_owned(),
        })?;

        Ok(Transfer {
            id,
            file_name: row.file_name,
            file_size: row.file_size as u64,
            total_chunks: row.total_chunks as u32,
            file_type: row.file_type,
            passcode,
            status,
        })
    }
}

#[async_trait]
impl TransferLedger for SqliteLedger {
    async fn create_passcode(&self, passcode: &Passcode) -> Result<(), LedgerError> {
        sqlx::query("INSERT INTO passcodes (passcode) VALUES (?1)")
            .bind(passcode.as_str())
            .execute(&self.pool)
            .await
            .map_err(LedgerError::Database)?;

        Ok(())
    }

    async fn passcode_exists(&self, passcode: &Passcode) -> Result<bool, LedgerError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM passcodes WHERE passcode = ?1")
                .bind(passcode.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(LedgerError::Database)?;

        Ok(count > 0)
    }

    async fn create_transfer(&self, transfer: NewTransfer) -> Result<Transfer, LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO transfers (id, file_name, file_size, total_chunks, file_type, passcode, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(transfer.id.to_string())
        .bind(&transfer.file_name)
        .bind(transfer.file_size as i64)
        .bind(transfer.total_chunks as i64)
        .bind(&transfer.file_type)
        .bind(transfer.passcode.as_str())
        .bind(TransferStatus::InProgress.as_str())
        .execute(&self.pool)
        .await
        .map_err(LedgerError::Database)?;

        Ok(Transfer {
            id: transfer.id,
            file_name: transfer.file_name,
            file_size: transfer.file_size,
            total_chunks: transfer.total_chunks,
            file_type: transfer.file_type,
            passcode: transfer.passcode,
            status: TransferStatus::InProgress,
        })
    }

    async fn update_status(
        &self,
        id: &TransferId,
        status: TransferStatus,
    ) -> Result<(), LedgerError> {
        // Terminal statuses are never overwritten.
        sqlx::query(
            "UPDATE transfers SET status = ?1 WHERE id = ?2 AND status = 'in_progress'",
        )
        .bind(status.as_str())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(LedgerError::Database)?;

        Ok(())
    }

    async fn read_transfer(&self, id: &TransferId) -> Result<Option<Transfer>, LedgerError> {
        let row = sqlx::query_as::<_, TransferRow>(
            r#"
            SELECT id, file_name, file_size, total_chunks, file_type, passcode, status
            FROM transfers
            WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(LedgerError::Database)?;

        row.map(Transfer::try_from).transpose()
    }

    async fn count_by_status(&self, status: TransferStatus) -> Result<u64, LedgerError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transfers WHERE status = ?1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(LedgerError::Database)?;

        Ok(count as u64)
    }
}
