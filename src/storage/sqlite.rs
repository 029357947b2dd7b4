//! Persistent storage backend on SQLite.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::backend::StorageBackend;

/// SQLite-based storage backend.
///
/// Survives process restarts. All access goes through one connection guarded
/// by a mutex.
pub struct SqliteBackend {
  conn: Mutex<Connection>,
}

impl SqliteBackend {
  /// Open the backend at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;
    Self::open_at(&path)
  }

  /// Open (or create) the backend at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create storage directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open storage database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a private in-memory database.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory storage database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let backend = Self {
      conn: Mutex::new(conn),
    };
    backend.run_migrations()?;
    Ok(backend)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("fleetcache").join("storage.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    self
      .conn()?
      .execute_batch(STORAGE_SCHEMA)
      .map_err(|e| eyre!("Failed to run storage migrations: {}", e))
  }

  fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

const STORAGE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS storage (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
"#;

impl StorageBackend for SqliteBackend {
  fn name(&self) -> &'static str {
    "sqlite"
  }

  fn get_item(&self, key: &str) -> Result<Option<String>> {
    self
      .conn()?
      .query_row(
        "SELECT value FROM storage WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read key {}: {}", key, e))
  }

  fn set_item(&self, key: &str, value: &str) -> Result<()> {
    self
      .conn()?
      .execute(
        "INSERT OR REPLACE INTO storage (key, value) VALUES (?, ?)",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write key {}: {}", key, e))?;
    Ok(())
  }

  fn remove_item(&self, key: &str) -> Result<()> {
    self
      .conn()?
      .execute("DELETE FROM storage WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to remove key {}: {}", key, e))?;
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    self
      .conn()?
      .execute("DELETE FROM storage", [])
      .map_err(|e| eyre!("Failed to clear storage: {}", e))?;
    Ok(())
  }

  fn key(&self, index: usize) -> Result<Option<String>> {
    let offset = i64::try_from(index).map_err(|e| eyre!("Key index out of range: {}", e))?;
    self
      .conn()?
      .query_row(
        "SELECT key FROM storage ORDER BY key LIMIT 1 OFFSET ?",
        params![offset],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read key at {}: {}", index, e))
  }

  fn length(&self) -> Result<usize> {
    let count: i64 = self
      .conn()?
      .query_row("SELECT COUNT(*) FROM storage", [], |row| row.get(0))
      .map_err(|e| eyre!("Failed to count keys: {}", e))?;
    usize::try_from(count).map_err(|e| eyre!("Invalid key count {}: {}", count, e))
  }

  fn keys(&self) -> Result<Vec<String>> {
    let conn = self.conn()?;
    let mut stmt = conn
      .prepare("SELECT key FROM storage ORDER BY key")
      .map_err(|e| eyre!("Failed to prepare key query: {}", e))?;

    let keys = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to query keys: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read keys: {}", e))?;

    Ok(keys)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("storage.db");

    {
      let backend = SqliteBackend::open_at(&path).unwrap();
      backend.set_item("fleet:vehicle", "{\"id\":1}").unwrap();
    }

    let reopened = SqliteBackend::open_at(&path).unwrap();
    assert_eq!(
      reopened.get_item("fleet:vehicle").unwrap().as_deref(),
      Some("{\"id\":1}")
    );
    assert_eq!(reopened.length().unwrap(), 1);
  }

  #[test]
  fn test_keys_are_sorted() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    backend.set_item("c", "3").unwrap();
    backend.set_item("a", "1").unwrap();
    backend.set_item("b", "2").unwrap();

    assert_eq!(backend.keys().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(backend.key(2).unwrap().as_deref(), Some("c"));
  }
}
