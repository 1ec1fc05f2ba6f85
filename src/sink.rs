use crate::level::{CaptureLevel, RemoteLogLevel};
use crate::record::ReportedError;
use crate::scope::ScopeContext;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::error::Error;
use std::time::{Duration, SystemTime};

/// Kind of a recorded breadcrumb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreadcrumbKind {
    /// A record without an error.
    Default,
    /// A record carrying a serialized error.
    Error,
}

impl BreadcrumbKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BreadcrumbKind::Default => "default",
            BreadcrumbKind::Error => "error",
        }
    }
}

/// A non-alerting trail entry attached to later captures.
#[derive(Debug, Clone, PartialEq)]
pub struct Breadcrumb {
    pub kind: BreadcrumbKind,
    pub level: CaptureLevel,
    pub message: Option<String>,
    /// The complete record.
    pub data: Map<String, Value>,
    pub timestamp: Option<SystemTime>,
}

/// Reporting backend that receives routed records.
///
/// The router awaits each call before pulling the next record, so a slow
/// backend throttles consumption of the stream.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Capture an error event enriched with `scope`.
    ///
    /// **Returns**
    /// - `Ok(())` once the backend accepted the event.
    /// - `Err(..)` if the backend failed. The router logs the failure and
    ///   moves on to the next record; nothing is retried.
    async fn capture_exception(
        &self,
        error: ReportedError,
        scope: ScopeContext,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Capture a plain message event enriched with `scope`.
    async fn capture_message(
        &self,
        message: Option<String>,
        scope: ScopeContext,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Append a breadcrumb to the current scope.
    async fn add_breadcrumb(
        &self,
        breadcrumb: Breadcrumb,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Send one entry to the structured logging API.
    ///
    /// `data` holds the record's remaining fields: the message field is
    /// removed and `trace_id` is renamed to `trace`.
    async fn log(
        &self,
        level: RemoteLogLevel,
        message: Option<String>,
        data: Map<String, Value>,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush anything the backend queued, waiting at most `timeout`.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self, _timeout: Duration) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
