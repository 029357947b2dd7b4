//! Collaborators told about terminal request failures.
//!
//! Both sinks are fire-and-forget: implementations must return quickly, and a
//! panicking sink never takes the request down with it.

use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, warn};

use super::error::ApiError;
use super::types::Method;

/// What the notification layer receives: `{ message, code, status }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReport {
  pub message: String,
  pub code: String,
  pub status: Option<u16>,
}

impl From<&ApiError> for FailureReport {
  fn from(err: &ApiError) -> Self {
    Self {
      message: err.message.clone(),
      code: err.code.to_string(),
      status: err.status,
    }
  }
}

/// Telemetry event emitted when analytics is enabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
  pub name: &'static str,
  pub method: Method,
  pub path: String,
  pub code: String,
  pub status: Option<u16>,
  /// Attempts made, including the first
  pub attempts: u32,
}

/// Receives terminal failures (toasts, notifications).
pub trait ErrorSink: Send + Sync {
  fn notify(&self, report: &FailureReport);
}

/// Receives telemetry events.
pub trait TelemetrySink: Send + Sync {
  fn track(&self, event: &TelemetryEvent);
}

/// Default error sink: writes the failure to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ErrorSink for LogSink {
  fn notify(&self, report: &FailureReport) {
    error!(code = %report.code, status = ?report.status, "{}", report.message);
  }
}

/// Default telemetry sink: drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
  fn track(&self, _event: &TelemetryEvent) {}
}

/// Run a sink call, swallowing any panic.
pub(crate) fn deliver(sink: &'static str, f: impl FnOnce()) {
  if catch_unwind(AssertUnwindSafe(f)).is_err() {
    warn!(sink, "sink panicked while handling a failure report");
  }
}
