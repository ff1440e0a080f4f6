// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persistent key/value store behind the desktop host's shared storage.
//
// Schema:
//   kv(
//     key   TEXT PRIMARY KEY,
//     value TEXT NOT NULL        -- JSON
//   )

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use snapit_core::StorageMap;
use snapit_core::error::SnapitError;
use tracing::{debug, instrument, warn};

/// Convert a `rusqlite::Error` into a `SnapitError::Database`.
fn db_err(e: rusqlite::Error) -> SnapitError {
    SnapitError::Database(e.to_string())
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);";

/// String-keyed store of JSON values backed by SQLite.
pub struct KvStore {
    conn: Connection,
}

impl KvStore {
    /// Open (or create) the store at `path` with WAL journaling.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SnapitError> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!("kv store opened");
        Ok(Self { conn })
    }

    /// Open an in-memory store (tests, throwaway sessions).
    pub fn open_in_memory() -> Result<Self, SnapitError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Read `keys`. Absent keys are omitted; a row whose JSON no longer
    /// parses is skipped with a warning.
    pub fn get(&self, keys: &[&str]) -> Result<StorageMap, SnapitError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT value FROM kv WHERE key = ?1")
            .map_err(db_err)?;

        let mut found = StorageMap::new();
        for key in keys {
            let raw: Option<String> = stmt
                .query_row(params![key], |row| row.get(0))
                .optional()
                .map_err(db_err)?;
            let Some(raw) = raw else { continue };
            match serde_json::from_str(&raw) {
                Ok(value) => {
                    found.insert((*key).to_string(), value);
                }
                Err(e) => warn!(key, error = %e, "skipping unreadable stored value"),
            }
        }
        Ok(found)
    }

    /// Write every entry in one transaction.
    #[instrument(skip_all, fields(keys = entries.len()))]
    pub fn set(&mut self, entries: &StorageMap) -> Result<(), SnapitError> {
        let tx = self.conn.transaction().map_err(db_err)?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO kv (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                )
                .map_err(db_err)?;
            for (key, value) in entries {
                let raw = serde_json::to_string(value)?;
                stmt.execute(params![key, raw]).map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;
        debug!("entries written");
        Ok(())
    }

    /// Delete `keys`. Missing keys are ignored.
    pub fn remove(&mut self, keys: &[&str]) -> Result<(), SnapitError> {
        let tx = self.conn.transaction().map_err(db_err)?;
        for key in keys {
            tx.execute("DELETE FROM kv WHERE key = ?1", params![key])
                .map_err(db_err)?;
        }
        tx.commit().map_err(db_err)?;
        Ok(())
    }

    /// Number of stored keys.
    pub fn len(&self) -> Result<usize, SnapitError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(pairs: &[(&str, serde_json::Value)]) -> StorageMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn get_returns_latest_value_or_omits() {
        let mut store = KvStore::open_in_memory().expect("open");
        store
            .set(&entries(&[("a", json!(1)), ("b", json!("x"))]))
            .expect("set");
        store.set(&entries(&[("a", json!({"n": 2}))])).expect("set");
        store.remove(&["b", "never-written"]).expect("remove");

        let got = store.get(&["a", "b", "c"]).expect("get");
        assert_eq!(got.len(), 1);
        assert_eq!(got["a"], json!({"n": 2}));
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("storage.db");
        {
            let mut store = KvStore::open(&path).expect("open");
            store
                .set(&entries(&[("imageId", json!("img_1_abc"))]))
                .expect("set");
        }
        let store = KvStore::open(&path).expect("reopen");
        assert_eq!(store.get(&["imageId"]).expect("get")["imageId"], json!("img_1_abc"));
        assert_eq!(store.len().expect("len"), 1);
    }
}
