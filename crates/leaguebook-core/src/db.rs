// SQLite persistence layer for the versioned key-value cache.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// SQLite-backed flat key-value store. Values are JSON documents; keys carry
/// their own version tag, so there is no TTL and no eviction.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure the cache table
    /// exists. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv_cache (
                key       TEXT PRIMARY KEY,
                value     TEXT NOT NULL,
                cached_at TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Resolve the configured cache path. An empty path maps to
    /// `<data dir>/leaguebook/cache.db`, falling back to the working directory
    /// when the platform has no data directory.
    pub fn resolve_path(configured: &str) -> Result<PathBuf> {
        if !configured.trim().is_empty() {
            return Ok(PathBuf::from(configured));
        }
        match directories::ProjectDirs::from("", "", "leaguebook") {
            Some(dirs) => {
                let dir = dirs.data_dir();
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
                Ok(dir.join("cache.db"))
            }
            None => Ok(PathBuf::from("leaguebook.db")),
        }
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let text = serde_json::to_string(value).context("failed to serialize cache value")?;
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO kv_cache (key, value, cached_at) VALUES (?1, ?2, ?3)",
                params![key, text, chrono::Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to save cache entry {key}"))?;
        Ok(())
    }

    /// The value stored under `key`, if any.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let text: Option<String> = self
            .conn()
            .query_row(
                "SELECT value FROM kv_cache WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("failed to read cache entry {key}"))?;
        text.map(|text| {
            serde_json::from_str(&text)
                .with_context(|| format!("cache entry {key} is not valid JSON"))
        })
        .transpose()
    }

    /// Typed wrapper over `save_state`.
    pub fn save_typed<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_value(value).context("failed to encode cache value")?;
        self.save_state(key, &json)
    }

    /// Typed wrapper over `load_state`. A stored value that no longer matches
    /// `T` (older layout under the same key) is an error, not a miss.
    pub fn load_typed<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.load_state(key)? {
            Some(value) => {
                let typed = serde_json::from_value(value)
                    .with_context(|| format!("cache entry {key} has an unexpected shape"))?;
                Ok(Some(typed))
            }
            None => Ok(None),
        }
    }

    /// Drop every `namespace` entry written under a version tag other than
    /// `keep_version`. Keys look like `{namespace}:{version}` or
    /// `{namespace}:{version}:...`. Returns the number of rows removed.
    pub fn prune_versions(&self, namespace: &str, keep_version: &str) -> Result<usize> {
        let ns = like_escape(namespace);
        let keep = format!("{namespace}:{keep_version}");
        let removed = self
            .conn()
            .execute(
                "DELETE FROM kv_cache
                 WHERE key LIKE ?1 ESCAPE '\\'
                   AND key <> ?2
                   AND key NOT LIKE ?3 ESCAPE '\\'",
                params![format!("{ns}:%"), keep, format!("{}:%", like_escape(&keep))],
            )
            .with_context(|| format!("failed to prune {namespace} cache entries"))?;
        Ok(removed)
    }

    /// Number of entries in the cache.
    pub fn entry_count(&self) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM kv_cache", [], |row| row.get(0))
            .context("failed to count cache entries")?;
        Ok(count as usize)
    }
}

/// Escape `LIKE` wildcards so `raw` matches literally under `ESCAPE '\\'`.
fn like_escape(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
