//! SQLite time-series store for poll records.
//!
//! One row per service per round, indexed on `(service_id, ts)` for range
//! scans. The database runs in WAL mode so the display can read while the
//! poll loop writes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use servicedash_types::{PollRecord, Status};

use crate::poller::PollOutcome;
use crate::timeutil::now_ts;

const CREATE_POLLS: &str = r#"
CREATE TABLE IF NOT EXISTS polls (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  ts INTEGER NOT NULL,
  service_id TEXT NOT NULL,
  service_name TEXT NOT NULL,
  status TEXT NOT NULL,
  severity INTEGER NOT NULL,
  message TEXT NOT NULL,
  latency_ms INTEGER,
  value_num REAL
)
"#;

const CREATE_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_polls_service_ts ON polls(service_id, ts)";

const SELECT_COLUMNS: &str =
    "SELECT ts, service_id, service_name, status, severity, message, latency_ms, value_num FROM polls";

/// Errors from the time-series store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, sqlx::FromRow)]
struct PollRow {
    ts: i64,
    service_id: String,
    service_name: String,
    status: String,
    severity: i64,
    message: String,
    latency_ms: Option<i64>,
    value_num: Option<f64>,
}

impl From<PollRow> for PollRecord {
    fn from(row: PollRow) -> Self {
        let severity = u8::try_from(row.severity).unwrap_or(Status::Unknown.severity());
        let status = Status::from_key(&row.status)
            .or_else(|| Status::from_severity(severity))
            .unwrap_or_default();
        PollRecord {
            timestamp: row.ts,
            service_id: row.service_id,
            service_name: row.service_name,
            status,
            severity,
            message: row.message,
            latency_ms: row.latency_ms.and_then(|l| u64::try_from(l).ok()),
            value: row.value_num,
        }
    }
}

/// Append-only log of poll records with retention pruning.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    path: PathBuf,
}

impl Store {
    /// Open (creating if needed) the database at `path` and bring its
    /// schema up to date.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool, path };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_POLLS).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEX).execute(&self.pool).await?;

        // Databases from before numeric readings lack `value_num`.
        let has_value: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info('polls') WHERE name = 'value_num'",
        )
        .fetch_one(&self.pool)
        .await?;
        if has_value == 0 {
            sqlx::query("ALTER TABLE polls ADD COLUMN value_num REAL")
                .execute(&self.pool)
                .await?;
            info!(path = %self.path.display(), "added value_num column");
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one round: a record per outcome, all stamped `timestamp`,
    /// committed together.
    pub async fn append(&self, timestamp: i64, outcomes: &[PollOutcome]) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        for outcome in outcomes {
            let record = outcome.to_record(timestamp);
            sqlx::query(
                r#"
                INSERT INTO polls (ts, service_id, service_name, status, severity, message, latency_ms, value_num)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.timestamp)
            .bind(&record.service_id)
            .bind(&record.service_name)
            .bind(record.status.key())
            .bind(i64::from(record.severity))
            .bind(&record.message)
            .bind(record.latency_ms.map(|l| i64::try_from(l).unwrap_or(i64::MAX)))
            .bind(record.value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(outcomes.len())
    }

    /// Delete records older than `retention_hours` before now.
    pub async fn prune(&self, retention_hours: u32) -> Result<u64, StoreError> {
        let cutoff = now_ts() - i64::from(retention_hours) * 3600;
        self.prune_before(cutoff).await
    }

    /// Delete records with a timestamp before `cutoff`; returns the count.
    pub async fn prune_before(&self, cutoff: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM polls WHERE ts < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Most recent record for a service.
    pub async fn latest(&self, service_id: &str) -> Result<Option<PollRecord>, StoreError> {
        let row = sqlx::query_as::<_, PollRow>(&format!(
            "{SELECT_COLUMNS} WHERE service_id = ? ORDER BY ts DESC, id DESC LIMIT 1"
        ))
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PollRecord::from))
    }

    /// Records for a service with `ts >= since`, oldest first.
    pub async fn history(&self, service_id: &str, since: i64) -> Result<Vec<PollRecord>, StoreError> {
        let rows = sqlx::query_as::<_, PollRow>(&format!(
            "{SELECT_COLUMNS} WHERE service_id = ? AND ts >= ? ORDER BY ts ASC, id ASC"
        ))
        .bind(service_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PollRecord::from).collect())
    }

    /// Timestamp of the newest persisted round, if any.
    pub async fn last_round_timestamp(&self) -> Result<Option<i64>, StoreError> {
        let ts: Option<i64> = sqlx::query_scalar("SELECT MAX(ts) FROM polls")
            .fetch_one(&self.pool)
            .await?;
        Ok(ts)
    }

    /// Close the pool, releasing the database file.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
