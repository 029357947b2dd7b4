//! Namespaced key-value storage with per-item expiry.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};

use super::backend::{Backend, Driver, SessionScope, StorageBackend};
use super::pipeline::{Pipeline, Transform};

/// A stored value together with its bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageItem<T> {
  /// Fully namespaced key
  pub key: String,
  pub value: T,
  /// Write time, epoch milliseconds
  pub timestamp: i64,
  /// Lifetime in milliseconds; `None` never expires
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ttl: Option<u64>,
}

impl<T> StorageItem<T> {
  /// An item is expired once `ttl` milliseconds or more have passed since it was written.
  pub fn is_expired(&self, now_millis: i64) -> bool {
    let Some(ttl) = self.ttl else {
      return false;
    };
    now_millis.saturating_sub(self.timestamp) >= i64::try_from(ttl).unwrap_or(i64::MAX)
  }
}

/// Construction-time settings for a `StorageEngine`.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageOptions {
  /// Namespace for every key this engine writes
  #[serde(default = "default_prefix")]
  pub prefix: String,
  #[serde(default)]
  pub driver: Driver,
  #[serde(default)]
  pub encryption: bool,
  #[serde(default)]
  pub compression: bool,
  /// Database file for the persistent driver (defaults to the data directory)
  #[serde(default)]
  pub path: Option<PathBuf>,
}

fn default_prefix() -> String {
  "fleet".to_string()
}

impl Default for StorageOptions {
  fn default() -> Self {
    Self {
      prefix: default_prefix(),
      driver: Driver::default(),
      encryption: false,
      compression: false,
      path: None,
    }
  }
}

impl StorageOptions {
  pub fn with_prefix(prefix: impl Into<String>) -> Self {
    Self {
      prefix: prefix.into(),
      ..Self::default()
    }
  }
}

/// Engine operation that hit an absorbed failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
  Get,
  Set,
  Remove,
  Clear,
  Enumerate,
  Export,
  Import,
}

/// A failure the engine recovered from. The caller only ever sees a default.
#[derive(Debug, Clone)]
pub struct StorageFailure {
  pub operation: StorageOp,
  /// Logical key involved, if any
  pub key: Option<String>,
  pub message: String,
}

impl fmt::Display for StorageFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.key {
      Some(key) => write!(f, "CACHE_ERROR {:?} {}: {}", self.operation, key, self.message),
      None => write!(f, "CACHE_ERROR {:?}: {}", self.operation, self.message),
    }
  }
}

/// Namespace for `prefix`. A `:` or `\` inside the prefix is escaped with
/// `\`, so the first unescaped `:` always ends the namespace and no
/// namespace is a string prefix of another.
fn namespace_for(prefix: &str) -> String {
  let mut namespace = String::with_capacity(prefix.len() + 1);
  for c in prefix.chars() {
    if c == ':' || c == '\\' {
      namespace.push('\\');
    }
    namespace.push(c);
  }
  namespace.push(':');
  namespace
}

/// Callback invoked for every absorbed failure.
pub type StorageObserver = Arc<dyn Fn(&StorageFailure) + Send + Sync>;

enum Lookup {
  Missing,
  Expired,
  Live(StorageItem<Value>),
}

/// Key-value store over a pluggable backend.
///
/// Every operation is total: backend, pipeline and decoding failures are
/// logged, handed to the observer, and turned into a safe default. Keys are
/// namespaced with `prefix:` so several engines can share one backend without
/// seeing each other's data.
pub struct StorageEngine {
  namespace: String,
  backend: Box<dyn StorageBackend>,
  pipeline: Pipeline,
  options: StorageOptions,
  clock: Arc<dyn Clock>,
  observer: Option<StorageObserver>,
}

impl StorageEngine {
  pub fn new(options: StorageOptions, backend: impl StorageBackend + 'static) -> Self {
    Self {
      namespace: namespace_for(&options.prefix),
      backend: Box::new(backend),
      pipeline: Pipeline::default(),
      options,
      clock: Arc::new(SystemClock),
      observer: None,
    }
  }

  /// Build the engine on the backend chosen by `options.driver`.
  pub fn open(options: StorageOptions, scope: Option<&SessionScope>) -> color_eyre::Result<Self> {
    let backend = Backend::for_driver(options.driver, scope, options.path.clone())?;
    Ok(Self::new(options, backend))
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_observer(mut self, observer: StorageObserver) -> Self {
    self.observer = Some(observer);
    self
  }

  /// Install a compression hook. It only runs if `compression` is enabled.
  pub fn with_compressor(mut self, hook: Arc<dyn Transform>) -> Self {
    self.pipeline = self.pipeline.with_compressor(hook, self.options.compression);
    self
  }

  /// Install an encryption hook. It only runs if `encryption` is enabled.
  pub fn with_cipher(mut self, hook: Arc<dyn Transform>) -> Self {
    self.pipeline = self.pipeline.with_cipher(hook, self.options.encryption);
    self
  }

  pub fn prefix(&self) -> &str {
    &self.options.prefix
  }

  pub fn backend_name(&self) -> &'static str {
    self.backend.name()
  }

  /// Read `key`, or `default` if it is missing, expired or unreadable.
  pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
    let Some(item) = self.read(&self.full_key(key)) else {
      return default;
    };

    match serde_json::from_value(item.value) {
      Ok(value) => value,
      Err(e) => {
        self.report(StorageOp::Get, Some(key), e);
        default
      }
    }
  }

  /// Write `value` under `key`, replacing whatever was there.
  pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
    self.write(key, value, ttl);
  }

  /// `set`, reporting whether the item reached the backend.
  fn write<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
    let full_key = self.full_key(key);
    let item = StorageItem {
      key: full_key.clone(),
      value,
      timestamp: self.clock.now_millis(),
      ttl: ttl.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
    };

    let raw = match self.pipeline.serialize(&item) {
      Ok(raw) => raw,
      Err(e) => {
        self.report(StorageOp::Set, Some(key), e);
        return false;
      }
    };

    match self.backend.set_item(&full_key, &raw) {
      Ok(()) => true,
      Err(e) => {
        self.report(StorageOp::Set, Some(key), e);
        false
      }
    }
  }

  pub fn remove(&self, key: &str) {
    self.remove_full(&self.full_key(key), StorageOp::Remove);
  }

  /// Remove every key in this engine's namespace.
  pub fn clear(&self) {
    for full_key in self.namespaced_keys() {
      self.remove_full(&full_key, StorageOp::Clear);
    }
  }

  /// True if `key` holds an unexpired item. An expired item is removed.
  pub fn has(&self, key: &str) -> bool {
    self.read(&self.full_key(key)).is_some()
  }

  /// Logical keys of all live items.
  pub fn keys(&self) -> Vec<String> {
    self
      .live_items()
      .into_iter()
      .map(|(key, _)| key)
      .collect()
  }

  /// Values of all live items that decode as `T`.
  pub fn values<T: DeserializeOwned>(&self) -> Vec<T> {
    self
      .entries()
      .into_iter()
      .map(|(_, value)| value)
      .collect()
  }

  /// `(logical key, value)` pairs of all live items that decode as `T`.
  pub fn entries<T: DeserializeOwned>(&self) -> Vec<(String, T)> {
    self
      .live_items()
      .into_iter()
      .filter_map(|(key, item)| match serde_json::from_value(item.value) {
        Ok(value) => Some((key, value)),
        Err(e) => {
          self.report(StorageOp::Enumerate, Some(key.as_str()), e);
          None
        }
      })
      .collect()
  }

  pub fn size(&self) -> usize {
    self.keys().len()
  }

  /// Dump live items as a JSON object of logical key to value.
  pub fn export(&self) -> String {
    let dump: Map<String, Value> = self
      .live_items()
      .into_iter()
      .map(|(key, item)| (key, item.value))
      .collect();

    match serde_json::to_string(&dump) {
      Ok(json) => json,
      Err(e) => {
        self.report(StorageOp::Export, None, e);
        "{}".to_string()
      }
    }
  }

  /// Restore a dump produced by [`export`](Self::export).
  ///
  /// Each entry goes through `set`, so it gets a fresh timestamp and no TTL.
  /// Returns the number of keys written.
  pub fn import(&self, json: &str) -> usize {
    let dump: Map<String, Value> = match serde_json::from_str(json) {
      Ok(dump) => dump,
      Err(e) => {
        self.report(StorageOp::Import, None, e);
        return 0;
      }
    };

    dump
      .iter()
      .filter(|(key, value)| self.write(key, value, None))
      .count()
  }

  /// Delete every expired item in the namespace. Returns how many were removed.
  pub fn purge_expired(&self) -> usize {
    let mut purged = 0;
    for full_key in self.namespaced_keys() {
      if let Lookup::Expired = self.load(&full_key) {
        self.remove_full(&full_key, StorageOp::Remove);
        purged += 1;
      }
    }
    purged
  }

  /// Remove every logical key starting with `prefix`, expired or not.
  /// Returns how many were removed.
  pub fn remove_matching(&self, prefix: &str) -> usize {
    let matching: Vec<String> = self
      .namespaced_keys()
      .into_iter()
      .filter(|full_key| self.logical_key(full_key).starts_with(prefix))
      .collect();

    for full_key in &matching {
      self.remove_full(full_key, StorageOp::Remove);
    }
    matching.len()
  }

  fn full_key(&self, key: &str) -> String {
    format!("{}{}", self.namespace, key)
  }

  fn logical_key<'a>(&self, full_key: &'a str) -> &'a str {
    full_key
      .strip_prefix(self.namespace.as_str())
      .unwrap_or(full_key)
  }

  fn namespaced_keys(&self) -> Vec<String> {
    match self.backend.keys() {
      Ok(keys) => keys
        .into_iter()
        .filter(|k| k.starts_with(&self.namespace))
        .collect(),
      Err(e) => {
        self.report(StorageOp::Enumerate, None, e);
        Vec::new()
      }
    }
  }

  fn live_items(&self) -> Vec<(String, StorageItem<Value>)> {
    self
      .namespaced_keys()
      .into_iter()
      .filter_map(|full_key| {
        let item = self.read(&full_key)?;
        Some((self.logical_key(&full_key).to_string(), item))
      })
      .collect()
  }

  /// Read a live item, deleting it if it has expired.
  fn read(&self, full_key: &str) -> Option<StorageItem<Value>> {
    match self.load(full_key) {
      Lookup::Live(item) => Some(item),
      Lookup::Expired => {
        debug!(key = full_key, "storage item expired");
        self.remove_full(full_key, StorageOp::Get);
        None
      }
      Lookup::Missing => None,
    }
  }

  fn load(&self, full_key: &str) -> Lookup {
    let logical = self.logical_key(full_key);

    let raw = match self.backend.get_item(full_key) {
      Ok(Some(raw)) => raw,
      Ok(None) => return Lookup::Missing,
      Err(e) => {
        self.report(StorageOp::Get, Some(logical), e);
        return Lookup::Missing;
      }
    };

    match self.pipeline.deserialize::<StorageItem<Value>>(&raw) {
      Ok(item) if item.is_expired(self.clock.now_millis()) => Lookup::Expired,
      Ok(item) => Lookup::Live(item),
      Err(e) => {
        self.report(StorageOp::Get, Some(logical), e);
        Lookup::Missing
      }
    }
  }

  fn remove_full(&self, full_key: &str, op: StorageOp) {
    if let Err(e) = self.backend.remove_item(full_key) {
      self.report(op, Some(self.logical_key(full_key)), e);
    }
  }

  fn report(&self, operation: StorageOp, key: Option<&str>, error: impl fmt::Display) {
    let failure = StorageFailure {
      operation,
      key: key.map(String::from),
      message: error.to_string(),
    };

    warn!(
      backend = self.backend.name(),
      prefix = %self.options.prefix,
      "{}",
      failure
    );

    if let Some(observer) = &self.observer {
      observer(&failure);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::clock::ManualClock;
  use crate::storage::backend::MemoryBackend;
  use crate::storage::pipeline::test_transforms::{Envelope, Reverse};
  use color_eyre::eyre::eyre;
  use serde_json::json;
  use std::sync::Mutex;

  fn engine_with_clock(prefix: &str) -> (StorageEngine, ManualClock) {
    let clock = ManualClock::new(1_700_000_000_000);
    let engine = StorageEngine::new(StorageOptions::with_prefix(prefix), MemoryBackend::new())
      .with_clock(Arc::new(clock.clone()));
    (engine, clock)
  }

  fn recording_observer() -> (StorageObserver, Arc<Mutex<Vec<StorageFailure>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let observer: StorageObserver = Arc::new(move |f: &StorageFailure| {
      sink.lock().unwrap().push(f.clone());
    });
    (observer, seen)
  }

  #[test]
  fn test_ttl_expiry_scenario() {
    let (engine, clock) = engine_with_clock("app");

    engine.set("user", &json!({"id": 1}), Some(Duration::from_millis(1000)));
    assert_eq!(engine.get("user", Value::Null), json!({"id": 1}));

    clock.advance(Duration::from_millis(1100));
    assert_eq!(engine.get("user", Value::Null), Value::Null);
    assert!(!engine.has("user"));
  }

  #[test]
  fn test_ttl_boundary() {
    let (engine, clock) = engine_with_clock("app");
    engine.set("k", &7u32, Some(Duration::from_millis(500)));

    clock.advance(Duration::from_millis(499));
    assert_eq!(engine.get("k", 0u32), 7);

    clock.advance(Duration::from_millis(1));
    assert_eq!(engine.get("k", 0u32), 0);
  }

  #[test]
  fn test_expired_item_is_deleted_on_read() {
    let backend = MemoryBackend::new();
    let clock = ManualClock::new(0);
    let engine = StorageEngine::new(StorageOptions::with_prefix("app"), backend.clone())
      .with_clock(Arc::new(clock.clone()));

    engine.set("token", &"abc", Some(Duration::from_secs(1)));
    clock.advance(Duration::from_secs(2));
    assert_eq!(backend.length().unwrap(), 1);

    assert!(!engine.has("token"));
    assert_eq!(backend.length().unwrap(), 0);
  }

  #[test]
  fn test_item_without_ttl_never_expires() {
    let (engine, clock) = engine_with_clock("app");
    engine.set("forever", &true, None);
    clock.advance(Duration::from_secs(60 * 60 * 24 * 365));
    assert!(engine.get("forever", false));
  }

  #[test]
  fn test_missing_key_returns_default() {
    let (engine, _) = engine_with_clock("app");
    assert_eq!(engine.get("nope", "fallback".to_string()), "fallback");
    assert!(!engine.has("nope"));
  }

  #[test]
  fn test_set_replaces_prior_value() {
    let (engine, clock) = engine_with_clock("app");
    engine.set("mileage", &100u32, Some(Duration::from_millis(10)));
    engine.set("mileage", &200u32, None);
    clock.advance(Duration::from_secs(1));
    assert_eq!(engine.get("mileage", 0u32), 200);
  }

  #[test]
  fn test_namespace_isolation() {
    let shared = MemoryBackend::new();
    let vehicles = StorageEngine::new(StorageOptions::with_prefix("vehicles"), shared.clone());
    let expenses = StorageEngine::new(StorageOptions::with_prefix("expenses"), shared.clone());

    vehicles.set("latest", &"truck-7", None);
    expenses.set("total", &1234.5, None);

    assert_eq!(vehicles.keys(), vec!["latest"]);
    assert_eq!(expenses.keys(), vec!["total"]);
    assert_eq!(expenses.get("latest", String::new()), "");

    expenses.clear();
    assert_eq!(expenses.size(), 0);
    assert_eq!(vehicles.get("latest", String::new()), "truck-7");
  }

  #[test]
  fn test_nested_prefixes_stay_isolated() {
    let shared = MemoryBackend::new();
    let app = StorageEngine::new(StorageOptions::with_prefix("app"), shared.clone());
    let v2 = StorageEngine::new(StorageOptions::with_prefix("app:v2"), shared.clone());

    v2.set("token", &"secret", None);
    app.set("v2:token", &"plain", None);

    assert_eq!(app.keys(), vec!["v2:token"]);
    assert_eq!(v2.keys(), vec!["token"]);
    assert_eq!(app.get("v2:token", String::new()), "plain");
    assert_eq!(v2.get("token", String::new()), "secret");

    app.clear();
    assert_eq!(app.size(), 0);
    assert_eq!(v2.get("token", String::new()), "secret");
  }

  #[test]
  fn test_namespace_escaping() {
    assert_eq!(namespace_for("fleet"), "fleet:");
    assert_eq!(namespace_for("app:v2"), "app\\:v2:");
    assert_eq!(namespace_for("a\\"), "a\\\\:");
    assert!(!namespace_for("app:v2").starts_with(&namespace_for("app")));
    assert!(!namespace_for("a\\").starts_with(&namespace_for("a")));
  }

  #[test]
  fn test_round_trip_through_hooks() {
    let options = StorageOptions {
      compression: true,
      encryption: true,
      ..StorageOptions::with_prefix("secure")
    };
    let backend = MemoryBackend::new();
    let engine = StorageEngine::new(options, backend.clone())
      .with_compressor(Arc::new(Reverse))
      .with_cipher(Arc::new(Envelope));

    let value = json!({"vehicle": {"id": 3, "tags": ["diesel", "fleet"]}});
    engine.set("v", &value, None);

    let raw = backend.get_item("secure:v").unwrap().unwrap();
    assert!(raw.starts_with("enc("));
    assert_eq!(engine.get("v", Value::Null), value);
  }

  #[test]
  fn test_enumeration_skips_expired() {
    let (engine, clock) = engine_with_clock("app");
    engine.set("a", &1, None);
    engine.set("b", &2, Some(Duration::from_millis(100)));
    engine.set("c", &3, None);

    assert_eq!(engine.size(), 3);
    clock.advance(Duration::from_millis(100));

    assert_eq!(engine.keys(), vec!["a", "c"]);
    assert_eq!(engine.values::<i32>(), vec![1, 3]);
    assert_eq!(
      engine.entries::<i32>(),
      vec![("a".to_string(), 1), ("c".to_string(), 3)]
    );
    assert_eq!(engine.size(), 2);
  }

  #[test]
  fn test_export_import_between_namespaces() {
    let shared = MemoryBackend::new();
    let (source, clock) = engine_with_clock("src");
    source.set("plate", &"XYZ-9", None);
    source.set("odometer", &42_000, None);
    source.set("stale", &"gone", Some(Duration::from_millis(1)));
    clock.advance(Duration::from_millis(5));

    let dump = source.export();
    let parsed: Value = serde_json::from_str(&dump).unwrap();
    assert_eq!(parsed, json!({"odometer": 42_000, "plate": "XYZ-9"}));

    let target = StorageEngine::new(StorageOptions::with_prefix("dst"), shared);
    assert_eq!(target.import(&dump), 2);
    assert_eq!(target.get("plate", String::new()), "XYZ-9");
    assert_eq!(target.get("odometer", 0), 42_000);
  }

  #[test]
  fn test_import_rejects_non_object() {
    let (engine, _) = engine_with_clock("app");
    let (observer, seen) = recording_observer();
    let engine = engine.with_observer(observer);

    assert_eq!(engine.import("[1,2,3]"), 0);
    assert_eq!(engine.size(), 0);
    assert_eq!(seen.lock().unwrap()[0].operation, StorageOp::Import);
  }

  #[test]
  fn test_corrupt_data_reports_and_defaults() {
    let backend = MemoryBackend::new();
    let (observer, seen) = recording_observer();
    let engine = StorageEngine::new(StorageOptions::with_prefix("app"), backend.clone())
      .with_observer(observer);

    backend.set_item("app:broken", "{not json").unwrap();
    assert_eq!(engine.get("broken", 5), 5);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].operation, StorageOp::Get);
    assert_eq!(seen[0].key.as_deref(), Some("broken"));
  }

  #[test]
  fn test_wrong_type_returns_default() {
    let (engine, _) = engine_with_clock("app");
    let (observer, seen) = recording_observer();
    let engine = engine.with_observer(observer);

    engine.set("name", &"not a number", None);
    assert_eq!(engine.get("name", 9u32), 9);
    assert_eq!(seen.lock().unwrap().len(), 1);
  }

  struct FailingBackend;

  impl StorageBackend for FailingBackend {
    fn name(&self) -> &'static str {
      "failing"
    }
    fn get_item(&self, _key: &str) -> color_eyre::Result<Option<String>> {
      Err(eyre!("read refused"))
    }
    fn set_item(&self, _key: &str, _value: &str) -> color_eyre::Result<()> {
      Err(eyre!("quota exceeded"))
    }
    fn remove_item(&self, _key: &str) -> color_eyre::Result<()> {
      Err(eyre!("remove refused"))
    }
    fn clear(&self) -> color_eyre::Result<()> {
      Err(eyre!("clear refused"))
    }
    fn key(&self, _index: usize) -> color_eyre::Result<Option<String>> {
      Err(eyre!("enumeration refused"))
    }
    fn length(&self) -> color_eyre::Result<usize> {
      Err(eyre!("enumeration refused"))
    }
  }

  #[test]
  fn test_backend_failures_are_absorbed() {
    let (observer, seen) = recording_observer();
    let engine =
      StorageEngine::new(StorageOptions::default(), FailingBackend).with_observer(observer);

    engine.set("k", &1, None);
    assert_eq!(engine.get("k", 0), 0);
    assert!(!engine.has("k"));
    engine.remove("k");
    engine.clear();
    assert!(engine.keys().is_empty());
    assert_eq!(engine.export(), "{}");

    let ops: Vec<StorageOp> = seen.lock().unwrap().iter().map(|f| f.operation).collect();
    assert!(ops.contains(&StorageOp::Set));
    assert!(ops.contains(&StorageOp::Get));
    assert!(ops.contains(&StorageOp::Remove));
    assert!(ops.contains(&StorageOp::Enumerate));
    assert!(seen.lock().unwrap()[0].message.contains("quota exceeded"));
  }

  #[test]
  fn test_import_counts_only_successful_writes() {
    let (observer, seen) = recording_observer();
    let engine =
      StorageEngine::new(StorageOptions::default(), FailingBackend).with_observer(observer);

    assert_eq!(engine.import(r#"{"a": 1, "b": 2}"#), 0);
    let failed_sets = seen
      .lock()
      .unwrap()
      .iter()
      .filter(|f| f.operation == StorageOp::Set)
      .count();
    assert_eq!(failed_sets, 2);
  }

  #[test]
  fn test_purge_expired() {
    let (engine, clock) = engine_with_clock("app");
    engine.set("short", &1, Some(Duration::from_millis(10)));
    engine.set("long", &2, Some(Duration::from_secs(10)));
    clock.advance(Duration::from_millis(20));

    assert_eq!(engine.purge_expired(), 1);
    assert_eq!(engine.keys(), vec!["long"]);
  }

  #[test]
  fn test_remove_matching_ignores_ttl() {
    let (engine, _) = engine_with_clock("app");
    engine.set("api_cache:a", &1, None);
    engine.set("api_cache:b", &2, Some(Duration::from_secs(60)));
    engine.set("auth_token", &"secret", None);

    assert_eq!(engine.remove_matching("api_cache:"), 2);
    assert_eq!(engine.keys(), vec!["auth_token"]);
  }

  #[test]
  fn test_open_from_options() {
    let dir = tempfile::tempdir().unwrap();
    let options = StorageOptions {
      driver: Driver::Persistent,
      path: Some(dir.path().join("fleet.db")),
      ..StorageOptions::default()
    };

    {
      let engine = StorageEngine::open(options.clone(), None).unwrap();
      assert_eq!(engine.backend_name(), "sqlite");
      engine.set("vehicle", &json!({"id": 12}), None);
    }

    let reopened = StorageEngine::open(options, None).unwrap();
    assert_eq!(reopened.get("vehicle", Value::Null), json!({"id": 12}));
  }
}
