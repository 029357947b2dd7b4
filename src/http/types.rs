//! Request and response types shared by the client and its transports.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Query parameters. Ordered so the same set always serializes the same way.
pub type Params = BTreeMap<String, String>;

/// Header map, lowercase names by convention.
pub type Headers = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
  Get,
  Post,
  Put,
  Patch,
  Delete,
  Head,
  Options,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Patch => "PATCH",
      Method::Delete => "DELETE",
      Method::Head => "HEAD",
      Method::Options => "OPTIONS",
    }
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Per-call overrides. Anything left `None` falls back to the client settings.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
  pub params: Params,
  pub headers: Headers,
  pub timeout: Option<Duration>,
  pub retry: Option<u32>,
  pub retry_delay: Option<Duration>,
  pub cache: Option<bool>,
  pub cache_ttl: Option<Duration>,
}

impl RequestOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.params.insert(key.into(), value.into());
    self
  }

  pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.insert(name.into(), value.into());
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn retry(mut self, retry: u32) -> Self {
    self.retry = Some(retry);
    self
  }

  pub fn retry_delay(mut self, delay: Duration) -> Self {
    self.retry_delay = Some(delay);
    self
  }

  pub fn cache(mut self, enabled: bool) -> Self {
    self.cache = Some(enabled);
    self
  }

  pub fn cache_ttl(mut self, ttl: Duration) -> Self {
    self.cache_ttl = Some(ttl);
    self
  }
}

/// Fully resolved configuration for one attempt of a request.
///
/// Never mutated: a retry is issued with the value from
/// [`next_attempt`](Self::next_attempt).
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
  pub path: String,
  pub method: Method,
  pub params: Params,
  pub data: Option<Value>,
  pub headers: Headers,
  pub timeout: Duration,
  /// Retries left after this attempt
  pub retry: u32,
  pub retry_delay: Duration,
  pub cache: bool,
  pub cache_ttl: Duration,
}

impl RequestConfig {
  /// Config for the following attempt, or `None` once the budget is spent.
  pub fn next_attempt(&self) -> Option<Self> {
    let retry = self.retry.checked_sub(1)?;
    Some(Self {
      retry,
      ..self.clone()
    })
  }
}

/// Request details recorded alongside a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseConfig {
  pub path: String,
  pub method: Method,
  #[serde(default)]
  pub params: Params,
  /// When the response was captured, epoch milliseconds
  pub timestamp: i64,
  /// Freshness budget in milliseconds; `None` uses the client default
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cache_ttl: Option<u64>,
}

/// A decoded response, live or served from cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<T> {
  pub data: T,
  pub status: u16,
  pub status_text: String,
  #[serde(default)]
  pub headers: Headers,
  pub config: ResponseConfig,
}

/// What the client stores per cache key.
pub type CachedResponse<T> = Response<T>;

impl<T> Response<T> {
  /// Fresh while less than the entry's own budget (or `default_ttl`) has passed.
  pub fn is_fresh(&self, now_millis: i64, default_ttl: Duration) -> bool {
    let ttl = self
      .config
      .cache_ttl
      .map(Duration::from_millis)
      .unwrap_or(default_ttl);
    let elapsed = now_millis.saturating_sub(self.config.timestamp);
    elapsed < i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
  }
}
