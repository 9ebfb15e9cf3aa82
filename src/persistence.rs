//! Best-effort key-value persistence for widget snapshots.
//!
//! Nothing here returns errors to widgets: reads that fail look like "no saved
//! state" and failed writes are logged and dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Result;

pub type DbPool = SqlitePool;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str);
    async fn remove(&self, key: &str);
}

/// Widget state table in sqlite.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;
        Self::from_pool(pool).await
    }

    /// Single-connection in-memory database; every connection would otherwise
    /// see its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: DbPool) -> Result<Self> {
        create_tables(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn try_get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM widget_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    pub async fn try_set(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO widget_state (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn try_remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM widget_state WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn keys(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT key FROM widget_state ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(key,)| key).collect())
    }

    /// Deletes every entry; returns how many rows went away.
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM widget_state")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Copies all rows, timestamps included, into `target`.
    pub async fn copy_to(&self, target: &SqliteStore) -> Result<usize> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT key, value, updated_at FROM widget_state")
                .fetch_all(&self.pool)
                .await?;

        for (key, value, updated_at) in &rows {
            sqlx::query(
                "INSERT OR REPLACE INTO widget_state (key, value, updated_at) VALUES (?, ?, ?)",
            )
            .bind(key)
            .bind(value)
            .bind(updated_at)
            .execute(&target.pool)
            .await?;
        }
        Ok(rows.len())
    }
}

async fn create_tables(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS widget_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.try_get(key).await.unwrap_or_else(|e| {
            warn!(key, error = %e, "failed to read widget state");
            None
        })
    }

    async fn set(&self, key: &str, value: &str) {
        if let Err(e) = self.try_set(key, value).await {
            warn!(key, error = %e, "failed to write widget state");
        }
    }

    async fn remove(&self, key: &str) {
        if let Err(e) = self.try_remove(key).await {
            warn!(key, error = %e, "failed to remove widget state");
        }
    }
}

/// In-process store. `fail_writes` makes every write a silent no-op, the way a
/// full browser storage quota behaves.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) {
        if self.fail_writes.load(Ordering::SeqCst) {
            warn!(key, "write rejected by store");
            return;
        }
        self.entries().insert(key.to_string(), value.to_string());
    }

    async fn remove(&self, key: &str) {
        if self.fail_writes.load(Ordering::SeqCst) {
            warn!(key, "remove rejected by store");
            return;
        }
        self.entries().remove(key);
    }
}

/// Deferred write owned by a widget. Each `schedule` replaces the pending
/// write, so a burst of changes lands as one write `delay` after the last.
pub struct DebouncedWriter {
    store: Arc<dyn KeyValueStore>,
    key: String,
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl DebouncedWriter {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>, delay: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            delay,
            pending: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Must be called from within a tokio runtime.
    pub fn schedule(&mut self, value: String) {
        if let Some(previous) = self.pending.take() {
            previous.abort();
        }
        let store = Arc::clone(&self.store);
        let key = self.key.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(key = %key, bytes = value.len(), "persisting widget state");
            store.set(&key, &value).await;
        }));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for DebouncedWriter {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
