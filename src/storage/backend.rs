//! Backend contract for the storage engine and the in-process variants.

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use super::sqlite::SqliteBackend;

/// String-keyed store of string blobs.
///
/// Every variant exposes the same surface so the engine never needs to know
/// which one it is talking to. Enumeration via `key(index)` is in
/// lexicographic key order.
pub trait StorageBackend: Send + Sync {
  /// Backend name for logging (e.g., "memory", "session", "sqlite").
  fn name(&self) -> &'static str;

  fn get_item(&self, key: &str) -> Result<Option<String>>;

  fn set_item(&self, key: &str, value: &str) -> Result<()>;

  fn remove_item(&self, key: &str) -> Result<()>;

  /// Remove every key in the backend, regardless of namespace.
  fn clear(&self) -> Result<()>;

  /// Key at `index` in enumeration order, if any.
  fn key(&self, index: usize) -> Result<Option<String>>;

  fn length(&self) -> Result<usize>;

  /// Snapshot of all keys currently stored.
  fn keys(&self) -> Result<Vec<String>> {
    let len = self.length()?;
    let mut keys = Vec::with_capacity(len);
    for index in 0..len {
      if let Some(key) = self.key(index)? {
        keys.push(key);
      }
    }
    Ok(keys)
  }
}

/// Which backend variant a `StorageEngine` runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
  /// Process memory, gone with the last handle
  #[default]
  Memory,
  /// Shared by everything opened from one `SessionScope`, gone with the scope
  Session,
  /// SQLite file, survives restarts
  Persistent,
}

/// Shared in-process map behind the memory and session backends. Clones see
/// the same items.
#[derive(Debug, Clone, Default)]
struct MapStore {
  items: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MapStore {
  fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>> {
    self.items.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  fn get(&self, key: &str) -> Result<Option<String>> {
    Ok(self.lock()?.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    self.lock()?.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    self.lock()?.remove(key);
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    self.lock()?.clear();
    Ok(())
  }

  fn nth_key(&self, index: usize) -> Result<Option<String>> {
    Ok(self.lock()?.keys().nth(index).cloned())
  }

  fn len(&self) -> Result<usize> {
    Ok(self.lock()?.len())
  }
}

/// Implements `StorageBackend` for a wrapper around a `MapStore` field named `items`.
macro_rules! map_backend {
  ($ty:ty, $name:literal) => {
    impl StorageBackend for $ty {
      fn name(&self) -> &'static str {
        $name
      }

      fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.items.get(key)
      }

      fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.set(key, value)
      }

      fn remove_item(&self, key: &str) -> Result<()> {
        self.items.remove(key)
      }

      fn clear(&self) -> Result<()> {
        self.items.clear()
      }

      fn key(&self, index: usize) -> Result<Option<String>> {
        self.items.nth_key(index)
      }

      fn length(&self) -> Result<usize> {
        self.items.len()
      }
    }
  };
}

/// Ephemeral backend. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
  items: MapStore,
}

impl MemoryBackend {
  pub fn new() -> Self {
    Self::default()
  }
}

map_backend!(MemoryBackend, "memory");

/// Owner of session-scoped data.
///
/// Engines and clients rebuilt from the same scope see the same data, the way
/// a page reload keeps its tab's storage. Dropping the scope (and every
/// backend opened from it) discards the data.
#[derive(Debug, Clone, Default)]
pub struct SessionScope {
  items: MapStore,
}

impl SessionScope {
  pub fn new() -> Self {
    Self::default()
  }

  /// Open a backend view onto this session.
  pub fn backend(&self) -> SessionBackend {
    SessionBackend {
      items: self.items.clone(),
    }
  }
}

/// Backend bound to a `SessionScope`.
#[derive(Debug, Clone)]
pub struct SessionBackend {
  items: MapStore,
}

map_backend!(SessionBackend, "session");

/// The closed set of backends an engine can run on.
pub enum Backend {
  Memory(MemoryBackend),
  Session(SessionBackend),
  Persistent(SqliteBackend),
}

impl Backend {
  pub fn memory() -> Self {
    Backend::Memory(MemoryBackend::new())
  }

  pub fn session(scope: &SessionScope) -> Self {
    Backend::Session(scope.backend())
  }

  /// Open the persistent backend at `path`, or at the default data location.
  pub fn persistent(path: Option<PathBuf>) -> Result<Self> {
    let backend = match path {
      Some(p) => SqliteBackend::open_at(&p)?,
      None => SqliteBackend::open()?,
    };
    Ok(Backend::Persistent(backend))
  }

  /// Build the backend selected by `driver`.
  ///
  /// `scope` is only consulted for `Driver::Session`; a fresh scope is created
  /// when none is given.
  pub fn for_driver(
    driver: Driver,
    scope: Option<&SessionScope>,
    path: Option<PathBuf>,
  ) -> Result<Self> {
    match driver {
      Driver::Memory => Ok(Self::memory()),
      Driver::Session => Ok(match scope {
        Some(s) => Self::session(s),
        None => Self::session(&SessionScope::new()),
      }),
      Driver::Persistent => Self::persistent(path),
    }
  }

  fn inner(&self) -> &dyn StorageBackend {
    match self {
      Backend::Memory(b) => b as &dyn StorageBackend,
      Backend::Session(b) => b,
      Backend::Persistent(b) => b,
    }
  }
}

impl StorageBackend for Backend {
  fn name(&self) -> &'static str {
    self.inner().name()
  }

  fn get_item(&self, key: &str) -> Result<Option<String>> {
    self.inner().get_item(key)
  }

  fn set_item(&self, key: &str, value: &str) -> Result<()> {
    self.inner().set_item(key, value)
  }

  fn remove_item(&self, key: &str) -> Result<()> {
    self.inner().remove_item(key)
  }

  fn clear(&self) -> Result<()> {
    self.inner().clear()
  }

  fn key(&self, index: usize) -> Result<Option<String>> {
    self.inner().key(index)
  }

  fn length(&self) -> Result<usize> {
    self.inner().length()
  }

  fn keys(&self) -> Result<Vec<String>> {
    self.inner().keys()
  }
}
