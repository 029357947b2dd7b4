//! HTTP client with response caching, bounded retry and per-attempt timeouts.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::storage::StorageEngine;

use super::cache_key::{cache_key, credential_scope, CACHE_NAMESPACE};
use super::error::ApiError;
use super::sinks::{
  deliver, ErrorSink, FailureReport, LogSink, NoopTelemetry, TelemetryEvent, TelemetrySink,
};
use super::transport::{Transport, TransportRequest, TransportResponse};
use super::types::{
  CachedResponse, Headers, Method, RequestConfig, RequestOptions, Response, ResponseConfig,
};

/// Service-level defaults. Every field can be overridden per call.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
  pub base_url: String,
  pub timeout: Duration,
  pub retry: u32,
  pub retry_delay: Duration,
  /// Cache GET responses unless a call says otherwise
  pub cache: bool,
  pub cache_ttl: Duration,
  /// Send terminal failures to the telemetry sink
  pub analytics: bool,
}

impl Default for ClientSettings {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:3000/api".to_string(),
      timeout: Duration::from_secs(10),
      retry: 3,
      retry_delay: Duration::from_secs(1),
      cache: true,
      cache_ttl: Duration::from_secs(5 * 60),
      analytics: false,
    }
  }
}

/// Caching HTTP client over a [`StorageEngine`].
///
/// Each call runs: cache check, then up to `1 + retry` attempts, each under
/// its own timeout and separated by a fixed `retry_delay`, then a cache
/// write on success. Nothing is de-duplicated: two concurrent calls for the
/// same key both go to the network and the last write wins.
#[derive(Clone)]
pub struct HttpClient {
  settings: ClientSettings,
  headers: Headers,
  token: Option<String>,
  storage: Arc<StorageEngine>,
  transport: Arc<dyn Transport>,
  clock: Arc<dyn Clock>,
  error_sink: Arc<dyn ErrorSink>,
  telemetry: Arc<dyn TelemetrySink>,
}

impl HttpClient {
  pub fn new(
    settings: ClientSettings,
    storage: Arc<StorageEngine>,
    transport: Arc<dyn Transport>,
  ) -> Self {
    let headers = Headers::from([
      ("accept".to_string(), "application/json".to_string()),
      ("content-type".to_string(), "application/json".to_string()),
    ]);

    Self {
      settings,
      headers,
      token: None,
      storage,
      transport,
      clock: Arc::new(SystemClock),
      error_sink: Arc::new(LogSink),
      telemetry: Arc::new(NoopTelemetry),
    }
  }

  /// Clock used to timestamp and age cached responses.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
    self.error_sink = sink;
    self
  }

  pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
    self.telemetry = sink;
    self
  }

  // --------------------------------------------------------------------------
  // Runtime configuration
  // --------------------------------------------------------------------------

  /// Attach a bearer token to every following request.
  ///
  /// Cached responses are scoped by token, so entries cached under the old
  /// token are not served under the new one.
  pub fn set_token(&mut self, token: impl Into<String>) {
    self.token = Some(token.into());
  }

  pub fn remove_token(&mut self) {
    self.token = None;
  }

  pub fn has_token(&self) -> bool {
    self.token.is_some()
  }

  pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
    self.headers.insert(name.into().to_lowercase(), value.into());
  }

  pub fn remove_header(&mut self, name: &str) {
    self.headers.remove(&name.to_lowercase());
  }

  pub fn set_base_url(&mut self, base_url: &str) -> color_eyre::Result<()> {
    url::Url::parse(base_url)
      .map_err(|e| color_eyre::eyre::eyre!("Invalid base URL {}: {}", base_url, e))?;
    self.settings.base_url = base_url.to_string();
    Ok(())
  }

  pub fn get_base_url(&self) -> &str {
    &self.settings.base_url
  }

  pub fn set_timeout(&mut self, timeout: Duration) {
    self.settings.timeout = timeout;
  }

  pub fn get_timeout(&self) -> Duration {
    self.settings.timeout
  }

  pub fn set_retry(&mut self, retry: u32) {
    self.settings.retry = retry;
  }

  pub fn get_retry(&self) -> u32 {
    self.settings.retry
  }

  pub fn set_retry_delay(&mut self, delay: Duration) {
    self.settings.retry_delay = delay;
  }

  pub fn get_retry_delay(&self) -> Duration {
    self.settings.retry_delay
  }

  pub fn set_cache(&mut self, enabled: bool) {
    self.settings.cache = enabled;
  }

  pub fn is_cache_enabled(&self) -> bool {
    self.settings.cache
  }

  pub fn set_cache_ttl(&mut self, ttl: Duration) {
    self.settings.cache_ttl = ttl;
  }

  pub fn get_cache_ttl(&self) -> Duration {
    self.settings.cache_ttl
  }

  pub fn set_analytics(&mut self, enabled: bool) {
    self.settings.analytics = enabled;
  }

  /// Drop every cached response, for every credential, regardless of age.
  /// Other keys in the storage namespace are left alone.
  pub fn clear_cache(&self) -> usize {
    let removed = self.storage.remove_matching(CACHE_NAMESPACE);
    debug!(removed, "cleared response cache");
    removed
  }

  // --------------------------------------------------------------------------
  // Requests
  // --------------------------------------------------------------------------

  pub async fn get<T>(&self, path: &str, options: RequestOptions) -> Result<Response<T>, ApiError>
  where
    T: DeserializeOwned + Serialize,
  {
    self.request(Method::Get, path, None, options).await
  }

  pub async fn post<T, B>(
    &self,
    path: &str,
    body: &B,
    options: RequestOptions,
  ) -> Result<Response<T>, ApiError>
  where
    T: DeserializeOwned + Serialize,
    B: Serialize + ?Sized,
  {
    self.request_with_body(Method::Post, path, body, options).await
  }

  pub async fn put<T, B>(
    &self,
    path: &str,
    body: &B,
    options: RequestOptions,
  ) -> Result<Response<T>, ApiError>
  where
    T: DeserializeOwned + Serialize,
    B: Serialize + ?Sized,
  {
    self.request_with_body(Method::Put, path, body, options).await
  }

  pub async fn patch<T, B>(
    &self,
    path: &str,
    body: &B,
    options: RequestOptions,
  ) -> Result<Response<T>, ApiError>
  where
    T: DeserializeOwned + Serialize,
    B: Serialize + ?Sized,
  {
    self.request_with_body(Method::Patch, path, body, options).await
  }

  pub async fn delete<T>(
    &self,
    path: &str,
    options: RequestOptions,
  ) -> Result<Response<T>, ApiError>
  where
    T: DeserializeOwned + Serialize,
  {
    self.request(Method::Delete, path, None, options).await
  }

  pub async fn head(&self, path: &str, options: RequestOptions) -> Result<Response<()>, ApiError> {
    self.request(Method::Head, path, None, options).await
  }

  pub async fn options<T>(
    &self,
    path: &str,
    options: RequestOptions,
  ) -> Result<Response<T>, ApiError>
  where
    T: DeserializeOwned + Serialize,
  {
    self.request(Method::Options, path, None, options).await
  }

  /// Run one logical request.
  ///
  /// 1. Serve a fresh cached response if caching applies
  /// 2. Otherwise attempt the call, retrying on any failure while budget remains
  /// 3. Cache the successful response
  /// 4. On terminal failure, notify the sinks and return the last error
  pub async fn request<T>(
    &self,
    method: Method,
    path: &str,
    data: Option<Value>,
    options: RequestOptions,
  ) -> Result<Response<T>, ApiError>
  where
    T: DeserializeOwned + Serialize,
  {
    let config = self.resolve(method, path, data, options);
    let key = config
      .cache
      .then(|| cache_key(&self.scope(), config.method, &config.path, &config.params));

    if let Some(key) = &key {
      if let Some(hit) = self.cached::<T>(key) {
        return Ok(hit);
      }
    }

    let response = self.execute::<T>(config).await?;

    if let Some(key) = &key {
      self.storage.set(key, &response, None);
    }

    Ok(response)
  }

  /// Encode `body` and run the request. A body that cannot be encoded is a
  /// terminal failure with no attempts, and still reaches the sinks.
  async fn request_with_body<T, B>(
    &self,
    method: Method,
    path: &str,
    body: &B,
    options: RequestOptions,
  ) -> Result<Response<T>, ApiError>
  where
    T: DeserializeOwned + Serialize,
    B: Serialize + ?Sized,
  {
    match encode_body(body) {
      Ok(data) => self.request(method, path, Some(data), options).await,
      Err(err) => {
        let config = self.resolve(method, path, None, options);
        self.report_failure(&config, &err, 0);
        Err(err)
      }
    }
  }

  fn resolve(
    &self,
    method: Method,
    path: &str,
    data: Option<Value>,
    options: RequestOptions,
  ) -> RequestConfig {
    let mut headers = self.headers.clone();
    if let Some(token) = &self.token {
      headers.insert("authorization".to_string(), format!("Bearer {}", token));
    }
    headers.extend(
      options
        .headers
        .into_iter()
        .map(|(name, value)| (name.to_lowercase(), value)),
    );

    RequestConfig {
      path: path.to_string(),
      method,
      params: options.params,
      data,
      headers,
      timeout: options.timeout.unwrap_or(self.settings.timeout),
      retry: options.retry.unwrap_or(self.settings.retry),
      retry_delay: options.retry_delay.unwrap_or(self.settings.retry_delay),
      // The service-level flag only covers GET; other methods must opt in
      cache: options
        .cache
        .unwrap_or(self.settings.cache && method == Method::Get),
      cache_ttl: options.cache_ttl.unwrap_or(self.settings.cache_ttl),
    }
  }

  fn scope(&self) -> String {
    credential_scope(self.token.as_deref())
  }

  /// Fresh cached response for `key`. A stale entry is deleted.
  fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<Response<T>> {
    let entry: Option<CachedResponse<T>> = self.storage.get(key, None);
    let entry = entry?;

    if entry.is_fresh(self.clock.now_millis(), self.settings.cache_ttl) {
      debug!(path = %entry.config.path, "cache hit");
      return Some(entry);
    }

    debug!(path = %entry.config.path, "cache entry stale");
    self.storage.remove(key);
    None
  }

  async fn execute<T: DeserializeOwned>(
    &self,
    initial: RequestConfig,
  ) -> Result<Response<T>, ApiError> {
    let mut config = initial;
    let mut attempts = 1;

    loop {
      let err = match self.attempt::<T>(&config).await {
        Ok(response) => return Ok(response),
        Err(err) => err,
      };

      let Some(next) = config.next_attempt() else {
        self.report_failure(&config, &err, attempts);
        return Err(err);
      };

      warn!(
        method = %config.method,
        path = %config.path,
        retries_left = next.retry,
        "request failed, retrying in {}ms: {}",
        config.retry_delay.as_millis(),
        err
      );
      tokio::time::sleep(config.retry_delay).await;
      config = next;
      attempts += 1;
    }
  }

  /// One network attempt under its own timeout. On timeout the transport
  /// future is dropped, which aborts the call.
  async fn attempt<T: DeserializeOwned>(
    &self,
    config: &RequestConfig,
  ) -> Result<Response<T>, ApiError> {
    let request = TransportRequest {
      method: config.method,
      url: join_url(&self.settings.base_url, &config.path),
      query: config.params.clone(),
      headers: config.headers.clone(),
      body: config.data.clone(),
    };

    let raw = match tokio::time::timeout(config.timeout, self.transport.send(request)).await {
      Ok(result) => result?,
      Err(_) => return Err(ApiError::timeout(config.timeout)),
    };

    if !raw.is_success() {
      return Err(ApiError::http(
        raw.status,
        &raw.status_text,
        decode_error_body(&raw),
      ));
    }

    let data = decode_body::<T>(&raw)?;

    Ok(Response {
      data,
      status: raw.status,
      status_text: raw.status_text,
      headers: raw.headers,
      config: ResponseConfig {
        path: config.path.clone(),
        method: config.method,
        params: config.params.clone(),
        timestamp: self.clock.now_millis(),
        cache_ttl: Some(u64::try_from(config.cache_ttl.as_millis()).unwrap_or(u64::MAX)),
      },
    })
  }

  fn report_failure(&self, config: &RequestConfig, err: &ApiError, attempts: u32) {
    let report = FailureReport::from(err);
    deliver("error", || self.error_sink.notify(&report));

    if self.settings.analytics {
      let event = TelemetryEvent {
        name: "api_error",
        method: config.method,
        path: config.path.clone(),
        code: report.code.clone(),
        status: report.status,
        attempts,
      };
      deliver("telemetry", || self.telemetry.track(&event));
    }
  }
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
  serde_json::to_value(body).map_err(ApiError::invalid_request)
}

/// Absolute URLs pass through; anything else is appended to `base`.
fn join_url(base: &str, path: &str) -> String {
  if path.starts_with("http://") || path.starts_with("https://") {
    return path.to_string();
  }
  format!(
    "{}/{}",
    base.trim_end_matches('/'),
    path.trim_start_matches('/')
  )
}

/// Decode a success body. An empty body decodes as JSON `null`.
fn decode_body<T: DeserializeOwned>(raw: &TransportResponse) -> Result<T, ApiError> {
  let body: &[u8] = if raw.body.iter().all(u8::is_ascii_whitespace) {
    b"null"
  } else {
    &raw.body
  };
  serde_json::from_slice(body).map_err(|e| ApiError::invalid_response(raw.status, e))
}

/// Error bodies are kept as JSON when they parse, or as a string when they don't.
fn decode_error_body(raw: &TransportResponse) -> Option<Value> {
  if raw.body.is_empty() {
    return None;
  }
  serde_json::from_slice(&raw.body)
    .ok()
    .or_else(|| Some(Value::String(String::from_utf8_lossy(&raw.body).into_owned())))
}
