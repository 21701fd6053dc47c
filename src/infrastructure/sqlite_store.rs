use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};

use crate::domain::repository::KeyValueStore;
use crate::error::SyncResult;

#[derive(Clone)]
pub struct SqliteKeyValueStore {
    pool: Arc<Pool<Sqlite>>,
}

impl SqliteKeyValueStore {
    /// One connection: the cache has a single writer, and `sqlite::memory:` databases
    /// are per connection.
    pub async fn connect(database_url: &str) -> SyncResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(database_url)
            .await?;
        Ok(Self { pool: Arc::new(pool) })
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn init(&self) -> SyncResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> SyncResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(match row {
            Some(row) => Some(row.try_get("value")?),
            None => None,
        })
    }

    async fn set(&self, key: &str, value: &str) -> SyncResult<()> {
        sqlx::query(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }
}

/// Creates the database file (and its directories) behind a `sqlite://` URL so the pool
/// can open it. Other URLs, `sqlite::memory:` included, are left alone.
pub fn prepare_sqlite_file(database_url: &str) -> std::io::Result<()> {
    let Some(location) = database_url.strip_prefix("sqlite://") else { return Ok(()) };
    let location = location.split('?').next().unwrap_or(location);
    // `sqlite:///C:/db.sqlite` names a drive path on Windows.
    let location = match location.strip_prefix('/') {
        Some(rest) if cfg!(windows) && rest.as_bytes().get(1) == Some(&b':') => rest,
        _ => location,
    };
    let path = Path::new(location);
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)?;
    Ok(())
}
