use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use log::{debug, info};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use tokio::sync::Mutex;

use crate::error_handling::types::StorageError;
use crate::storage::storage_trait::Storage;
use crate::storage::types::{Attempt, NewAttempt, Stats};

// Internal row mapping for attempts to avoid manual try_get
#[derive(Debug, sqlx::FromRow)]
struct AttemptRow {
    id: i64,
    ip: String,
    data: Option<String>,
    timestamp: String,
}

impl AttemptRow {
    fn into_attempt(self) -> Result<Attempt, StorageError> {
        Ok(Attempt {
            id: self.id,
            ip: self.ip,
            data: self.data,
            timestamp: parse_timestamp(&self.timestamp)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| StorageError::ReadFailed(format!("bad timestamp '{}': {}", raw, e)))
}

// Fixed-width UTC so that lexical order in SQLite matches time order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn read_err(e: sqlx::Error) -> StorageError {
    StorageError::ReadFailed(e.to_string())
}

fn write_err(e: sqlx::Error) -> StorageError {
    StorageError::WriteFailed(e.to_string())
}

/// SQLite-backed attempt store.
pub struct SqliteStorage {
    pool: Pool<Sqlite>,
    /// Latest timestamp handed out; inserts are serialized through this lock.
    last_timestamp: Mutex<Option<DateTime<Utc>>>,
}

impl SqliteStorage {
    /// Opens (creating when missing) the database behind `url`, e.g. `sqlite://attempts.db`,
    /// and makes sure the schema exists.
    pub async fn open(url: &str) -> Result<Self, StorageError> {
        if !url.starts_with("sqlite:") {
            return Err(StorageError::ConnectionFailed(format!(
                "'{}' is not a sqlite URL",
                url
            )));
        }
        let opts = SqliteConnectOptions::from_str(url)
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
        Self::connect(opts).await
    }

    /// Opens a database file at `path`.
    pub async fn open_file<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Self::connect(SqliteConnectOptions::new().filename(path)).await
    }

    async fn connect(opts: SqliteConnectOptions) -> Result<Self, StorageError> {
        let opts = opts.create_if_missing(true);
        let location = opts.get_filename().display().to_string();

        if let Some(parent) = opts.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ip TEXT NOT NULL,
                data TEXT,
                timestamp TEXT NOT NULL
            );",
        )
        .execute(&pool)
        .await
        .map_err(write_err)?;
        sqlx::query("CREATE INDEX IF NOT EXISTS ix_attempts_ip ON attempts (ip);")
            .execute(&pool)
            .await
            .map_err(write_err)?;
        sqlx::query("CREATE INDEX IF NOT EXISTS ix_attempts_timestamp ON attempts (timestamp);")
            .execute(&pool)
            .await
            .map_err(write_err)?;

        let latest: Option<String> = sqlx::query_scalar("SELECT MAX(timestamp) FROM attempts")
            .fetch_one(&pool)
            .await
            .map_err(read_err)?;
        let latest = latest.as_deref().map(parse_timestamp).transpose()?;

        info!("Attempts database ready at {}", location);

        Ok(Self {
            pool,
            last_timestamp: Mutex::new(latest),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn insert(&self, attempt: NewAttempt) -> Result<Attempt, StorageError> {
        let mut last = self.last_timestamp.lock().await;

        let now = Utc::now().trunc_subsecs(6);
        let timestamp = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };

        let result = sqlx::query("INSERT INTO attempts (ip, data, timestamp) VALUES (?1, ?2, ?3)")
            .bind(&attempt.ip)
            .bind(attempt.data.as_deref())
            .bind(format_timestamp(&timestamp))
            .execute(&self.pool)
            .await
            .map_err(write_err)?;

        *last = Some(timestamp);
        let id = result.last_insert_rowid();
        debug!("Stored attempt {} from {}", id, attempt.ip);

        Ok(Attempt {
            id,
            ip: attempt.ip,
            data: attempt.data,
            timestamp,
        })
    }

    async fn list(&self, skip: u64, limit: u64) -> Result<Vec<Attempt>, StorageError> {
        let rows: Vec<AttemptRow> = sqlx::query_as::<_, AttemptRow>(
            "SELECT id, ip, data, timestamp FROM attempts
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1 OFFSET ?2",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(skip).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;

        rows.into_iter().map(AttemptRow::into_attempt).collect()
    }

    async fn stats(&self) -> Result<Stats, StorageError> {
        let (total, unique): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COUNT(DISTINCT ip) FROM attempts")
                .fetch_one(&self.pool)
                .await
                .map_err(read_err)?;

        Ok(Stats {
            total_attempts: total.max(0) as u64,
            unique_ips: unique.max(0) as u64,
        })
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn temp_db() -> (SqliteStorage, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::open_file(dir.path().join("test.sqlite3"))
            .await
            .unwrap();
        (storage, dir)
    }

    fn attempt(ip: &str, data: &str) -> NewAttempt {
        NewAttempt::new(ip, Some(data.to_string()))
    }

    #[tokio::test]
    async fn test_db_insert_assigns_ids_and_timestamps() {
        let (storage, _dir) = temp_db().await;

        let first = storage.insert(attempt("10.0.0.1", "a")).await.unwrap();
        let second = storage.insert(attempt("10.0.0.2", "b")).await.unwrap();

        assert!(second.id > first.id);
        assert!(second.timestamp >= first.timestamp);
        assert_eq!(second.data.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_db_list_newest_first_and_window() {
        let (storage, _dir) = temp_db().await;
        for i in 0..5 {
            storage
                .insert(attempt("10.0.0.1", &format!("payload-{}", i)))
                .await
                .unwrap();
        }

        let all = storage.list(0, 100).await.unwrap();
        let payloads: Vec<_> = all.iter().filter_map(|a| a.data.clone()).collect();
        assert_eq!(
            payloads,
            vec!["payload-4", "payload-3", "payload-2", "payload-1", "payload-0"]
        );

        let window = storage.list(1, 2).await.unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].data.as_deref(), Some("payload-3"));
        assert_eq!(window[1].data.as_deref(), Some("payload-2"));

        assert!(storage.list(10, 5).await.unwrap().is_empty());
        assert!(storage.list(0, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_db_stats_counts_distinct_ips() {
        let (storage, _dir) = temp_db().await;
        assert_eq!(storage.stats().await.unwrap(), Stats::default());

        storage.insert(attempt("10.0.0.1", "a")).await.unwrap();
        storage.insert(attempt("10.0.0.1", "b")).await.unwrap();
        storage.insert(attempt("10.0.0.2", "c")).await.unwrap();
        storage.insert(NewAttempt::new("::1", None)).await.unwrap();

        let stats = storage.stats().await.unwrap();
        assert_eq!(stats.total_attempts, 4);
        assert_eq!(stats.unique_ips, 3);
    }

    #[tokio::test]
    async fn test_db_reopen_keeps_rows_and_ordering() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("attempts.sqlite3");

        let before = {
            let storage = SqliteStorage::open_file(&path).await.unwrap();
            storage.insert(attempt("10.0.0.1", "old")).await.unwrap()
        };

        let storage = SqliteStorage::open_file(&path).await.unwrap();
        let after = storage.insert(attempt("10.0.0.2", "new")).await.unwrap();
        assert!(after.timestamp >= before.timestamp);

        let listed = storage.list(0, 1).await.unwrap();
        assert_eq!(listed[0].data.as_deref(), Some("new"));
        assert!(storage.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_db_open_rejects_bad_url() {
        let result = SqliteStorage::open("mysql://localhost/attempts").await;
        assert!(matches!(result, Err(StorageError::ConnectionFailed(_))));
    }
}
