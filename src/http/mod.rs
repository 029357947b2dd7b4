//! Caching HTTP client for the fleet API.
//!
//! Responses are cached in a [`StorageEngine`](crate::storage::StorageEngine)
//! under keys derived from the request path, query parameters and the active
//! credential. Failures are retried with a fixed delay and each attempt runs
//! under its own timeout.

mod cache_key;
mod client;
mod error;
mod sinks;
mod transport;
mod types;

pub use cache_key::{cache_key, credential_scope, ANONYMOUS_SCOPE, CACHE_NAMESPACE};
pub use client::{ClientSettings, HttpClient};
pub use error::{ApiError, ErrorCode, TransportError};
pub use sinks::{ErrorSink, FailureReport, LogSink, NoopTelemetry, TelemetryEvent, TelemetrySink};
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
pub use types::{
  CachedResponse, Headers, Method, Params, RequestConfig, RequestOptions, Response, ResponseConfig,
};
