//! Persistent run records: the bounded ledger of summaries plus one detail
//! blob per run.
//!
//! Storage is a flat string-keyed blob store so the key layout stays
//! bit-compatible with the other clients that share it: the ledger lives
//! under [`LEDGER_KEY`] as a JSON array of [`RunSummary`], each detail under
//! [`RUN_KEY_PREFIX`] + run id. Corrupt or missing blobs are swallowed here
//! and nowhere else.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};

use crate::model::{RunDetail, RunSummary};

/// Ledger key shared with the other store clients.
pub const LEDGER_KEY: &str = "noema_recent_runs";
/// Per-run detail keys are this prefix plus the run id.
pub const RUN_KEY_PREFIX: &str = "noema_run_";
/// The ledger keeps at most this many entries, dropping the oldest.
pub const LEDGER_CAP: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("task join error: {0}")]
    Join(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Flat blob store keyed by string. The platform analogue of browser
/// local storage.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

// =============================================================================
// SQLite backend
// =============================================================================

#[derive(Clone)]
pub struct SqliteKvStore {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKvStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(&path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;\
             PRAGMA synchronous=NORMAL;\
             CREATE TABLE IF NOT EXISTS kv (\
               key TEXT PRIMARY KEY,\
               value TEXT NOT NULL,\
               updated_at INTEGER NOT NULL\
             );",
        )?;
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_conn<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&Connection) -> Result<R, StoreError>,
    {
        let guard = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&guard)
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            store.with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
                let mut rows = stmt.query(params![key])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row.get::<_, String>(0)?)),
                    None => Ok(None),
                }
            })
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        let value = value.to_string();
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            store.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3) \
                     ON CONFLICT(key) DO UPDATE SET \
                        value = excluded.value, \
                        updated_at = excluded.updated_at",
                    params![key, value, crate::model::now_epoch_ms()],
                )?;
                Ok(())
            })
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            store.with_conn(|conn| {
                conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
                Ok(())
            })
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

// =============================================================================
// In-memory backend
// =============================================================================

/// HashMap-backed store for tests and ephemeral sessions.
#[derive(Clone, Default)]
pub struct MemoryKvStore {
    map: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.map.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.map.lock().map_err(|_| StoreError::Poisoned)?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.map.lock().map_err(|_| StoreError::Poisoned)?;
        map.remove(key);
        Ok(())
    }
}

// =============================================================================
// Run repository
// =============================================================================

/// Repository over the shared blob store. All ledger and detail access goes
/// through here.
#[derive(Clone)]
pub struct RunStore {
    kv: Arc<dyn KvStore>,
}

impl RunStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub fn detail_key(run_id: &str) -> String {
        format!("{RUN_KEY_PREFIX}{run_id}")
    }

    /// The ledger, most recent first. Absent, corrupt, or non-array storage
    /// yields an empty list; nothing here fails.
    pub async fn list_summaries(&self) -> Vec<RunSummary> {
        let raw = match self.kv.get(LEDGER_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(error = %err, "ledger read failed, treating as empty");
                return Vec::new();
            }
        };
        let mut runs: Vec<RunSummary> = match serde_json::from_str(&raw) {
            Ok(runs) => runs,
            Err(err) => {
                tracing::warn!(error = %err, "ledger blob corrupt, treating as empty");
                return Vec::new();
            }
        };
        runs.sort_by_key(|r| Reverse(r.ts));
        runs
    }

    /// Detail blob by exact key; `None` on miss or parse failure.
    pub async fn get_detail(&self, run_id: &str) -> Option<RunDetail> {
        let raw = match self.kv.get(&Self::detail_key(run_id)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(run_id, error = %err, "detail read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(detail) => Some(detail),
            Err(err) => {
                tracing::warn!(run_id, error = %err, "detail blob corrupt");
                None
            }
        }
    }

    /// Record a freshly submitted run: the detail blob and a head insertion
    /// into the ledger, truncated to [`LEDGER_CAP`], in one call.
    pub async fn record_run(
        &self,
        summary: RunSummary,
        detail: &RunDetail,
    ) -> Result<(), StoreError> {
        let detail_raw = serde_json::to_string(detail)?;
        self.kv
            .put(&Self::detail_key(&summary.run_id), &detail_raw)
            .await?;

        let mut ledger = self.list_summaries().await;
        ledger.insert(0, summary);
        ledger.truncate(LEDGER_CAP);
        let ledger_raw = serde_json::to_string(&ledger)?;
        self.kv.put(LEDGER_KEY, &ledger_raw).await
    }

    /// Load the detail, set `verified`, write it back. Silently a no-op when
    /// the detail is missing.
    pub async fn set_verified(&self, run_id: &str, ok: bool) -> Result<(), StoreError> {
        let mut detail = match self.get_detail(run_id).await {
            Some(detail) => detail,
            None => return Ok(()),
        };
        detail.verified = Some(ok);
        let raw = serde_json::to_string(&detail)?;
        self.kv.put(&Self::detail_key(run_id), &raw).await
    }

    /// Delete every detail referenced by the ledger, then the ledger itself.
    /// Individual detail failures are logged and skipped.
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        let runs = self.list_summaries().await;
        for run in &runs {
            if let Err(err) = self.kv.delete(&Self::detail_key(&run.run_id)).await {
                tracing::warn!(run_id = %run.run_id, error = %err, "detail delete failed");
            }
        }
        self.kv.delete(LEDGER_KEY).await
    }
}
