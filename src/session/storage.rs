//! Durable key-value storage for the session, with SQLite and in-memory
//! implementations.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Synchronous key-value persistence medium.
pub trait KeyValueStorage: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>>;

  /// Store `set` and delete `remove` as one unit: either every change
  /// lands or none does. Missing keys are not an error.
  fn replace(&self, set: &[(&str, &str)], remove: &[&str]) -> Result<()>;

  fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
    self.replace(entries, &[])
  }

  fn remove_many(&self, keys: &[&str]) -> Result<()> {
    self.replace(&[], keys)
  }
}

/// Storage that lives only as long as the process. Clones share entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
  entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  /// Keys currently stored, sorted.
  pub fn keys(&self) -> Vec<String> {
    let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    let mut keys: Vec<_> = entries.keys().cloned().collect();
    keys.sort();
    keys
  }
}

impl KeyValueStorage for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(entries.get(key).cloned())
  }

  fn replace(&self, set: &[(&str, &str)], remove: &[&str]) -> Result<()> {
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    for (key, value) in set {
      entries.insert((*key).to_string(), (*value).to_string());
    }
    for key in remove {
      entries.remove(*key);
    }
    Ok(())
  }
}

/// SQLite-based storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the database at `path`, or at the default location.
  pub fn open(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create session directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open session database at {}: {}", path.display(), e))?;

    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("paydash").join("session.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(SESSION_SCHEMA)
      .map_err(|e| eyre!("Failed to run session migrations: {}", e))?;

    Ok(())
  }
}

const SESSION_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl KeyValueStorage for SqliteStorage {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read {}: {}", key, e))
  }

  fn replace(&self, set: &[(&str, &str)], remove: &[&str]) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    for (key, value) in set {
      tx.execute(
        "INSERT OR REPLACE INTO kv_store (key, value, updated_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to store {}: {}", key, e))?;
    }

    for key in remove {
      tx.execute("DELETE FROM kv_store WHERE key = ?", params![key])
        .map_err(|e| eyre!("Failed to remove {}: {}", key, e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }
}
