//! Normalized error returned by the HTTP client.

use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure category, rendered the way callers branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
  /// The attempt ran past its timeout and was cancelled
  Timeout,
  /// The server answered with a non-2xx status
  Http(u16),
  /// No response was received
  Network,
  /// A 2xx response whose body could not be decoded
  InvalidResponse,
  /// The request body could not be encoded; nothing was sent
  InvalidRequest,
}

impl fmt::Display for ErrorCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ErrorCode::Timeout => f.write_str("TIMEOUT"),
      ErrorCode::Http(status) => write!(f, "HTTP_{}", status),
      ErrorCode::Network => f.write_str("NETWORK_ERROR"),
      ErrorCode::InvalidResponse => f.write_str("INVALID_RESPONSE"),
      ErrorCode::InvalidRequest => f.write_str("INVALID_REQUEST"),
    }
  }
}

/// `{ message, code, status, data }` as seen by callers.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
  pub message: String,
  pub code: ErrorCode,
  pub status: Option<u16>,
  /// Decoded error body, when the server sent one
  pub data: Option<Value>,
}

impl ApiError {
  pub fn timeout(after: Duration) -> Self {
    Self {
      message: format!("Request timed out after {}ms", after.as_millis()),
      code: ErrorCode::Timeout,
      status: Some(408),
      data: None,
    }
  }

  /// Build from a non-2xx response. A string `message` field in the body wins
  /// over the status text.
  pub fn http(status: u16, status_text: &str, body: Option<Value>) -> Self {
    let message = body
      .as_ref()
      .and_then(|b| b.get("message"))
      .and_then(Value::as_str)
      .map(String::from)
      .or_else(|| (!status_text.is_empty()).then_some(status_text.to_string()))
      .unwrap_or_else(|| format!("Request failed with status {}", status));

    Self {
      message,
      code: ErrorCode::Http(status),
      status: Some(status),
      data: body,
    }
  }

  pub fn network(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      code: ErrorCode::Network,
      status: None,
      data: None,
    }
  }

  pub fn invalid_response(status: u16, reason: impl fmt::Display) -> Self {
    Self {
      message: format!("Failed to decode response body: {}", reason),
      code: ErrorCode::InvalidResponse,
      status: Some(status),
      data: None,
    }
  }

  pub fn invalid_request(reason: impl fmt::Display) -> Self {
    Self {
      message: format!("Failed to encode request body: {}", reason),
      code: ErrorCode::InvalidRequest,
      status: None,
      data: None,
    }
  }

  pub fn is_timeout(&self) -> bool {
    self.code == ErrorCode::Timeout
  }
}

/// Failure inside a transport, before any response was received.
#[derive(Debug, Error)]
pub enum TransportError {
  #[error("invalid url {url}: {reason}")]
  InvalidUrl { url: String, reason: String },

  #[error("request failed: {0}")]
  Request(String),

  #[error("failed to read response body: {0}")]
  Body(String),
}

impl From<TransportError> for ApiError {
  fn from(err: TransportError) -> Self {
    ApiError::network(err.to_string())
  }
}
