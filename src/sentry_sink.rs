use crate::level::{CaptureLevel, RemoteLogLevel};
use crate::record::{millis_to_time, ReportedError};
use crate::scope::ScopeContext;
use crate::sink::{Breadcrumb, ReportSink};
use crate::stacktrace::parse_v8_stack;
use async_trait::async_trait;
use sentry::protocol::{Context, Event, Exception, Log, LogAttribute, LogLevel};
use sentry::{Hub, Level, Scope};
use serde_json::{Map, Value};
use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Breadcrumb category used for every routed record.
const BREADCRUMB_CATEGORY: &str = "pino";

/// [`ReportSink`] backed by a Sentry [`Hub`].
///
/// Captures are handed to the hub's client, which queues and sends them on
/// its own transport thread, so none of the calls block on the network.
#[derive(Clone)]
pub struct SentrySink {
    hub: Arc<Hub>,
}

impl SentrySink {
    pub fn new(hub: Arc<Hub>) -> Self {
        SentrySink { hub }
    }

    /// A sink reporting through the hub bound to the current thread.
    pub fn current() -> Self {
        Self::new(Hub::current())
    }

    /// A sink reporting through the process-wide main hub.
    pub fn main() -> Self {
        Self::new(Hub::main())
    }

    fn capture_with_scope(&self, event: Event<'static>, context: ScopeContext) {
        self.hub
            .with_scope(|scope| apply_scope(scope, context), || self.hub.capture_event(event));
    }
}

fn sentry_level(level: CaptureLevel) -> Level {
    match level {
        CaptureLevel::Debug => Level::Debug,
        CaptureLevel::Info | CaptureLevel::Log => Level::Info,
        CaptureLevel::Warning => Level::Warning,
        CaptureLevel::Error => Level::Error,
        CaptureLevel::Fatal => Level::Fatal,
    }
}

fn sentry_log_level(level: RemoteLogLevel) -> LogLevel {
    match level {
        RemoteLogLevel::Debug => LogLevel::Debug,
        RemoteLogLevel::Info => LogLevel::Info,
        RemoteLogLevel::Warn => LogLevel::Warn,
        RemoteLogLevel::Error => LogLevel::Error,
        RemoteLogLevel::Fatal => LogLevel::Fatal,
    }
}

fn apply_scope(scope: &mut Scope, context: ScopeContext) {
    scope.set_level(Some(sentry_level(context.level)));

    for (key, value) in context.tags {
        match value {
            Some(value) => scope.set_tag(&key, value),
            None => scope.remove_tag(&key),
        }
    }

    for (key, map) in context.contexts {
        scope.set_context(&key, Context::Other(map.into_iter().collect()));
    }
}

/// Log attributes must be scalars; structured values are sent as JSON text.
fn log_attribute(value: Value) -> LogAttribute {
    match value {
        Value::Array(_) | Value::Object(_) => LogAttribute(Value::String(value.to_string())),
        scalar => LogAttribute(scalar),
    }
}

#[async_trait]
impl ReportSink for SentrySink {
    async fn capture_exception(
        &self,
        error: ReportedError,
        scope: ScopeContext,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut event = Event {
            level: sentry_level(scope.level),
            ..Default::default()
        };

        if let Some(stack) = &error.stack {
            event
                .extra
                .insert("stack".to_owned(), Value::String(stack.clone()));
        }

        event.exception = vec![Exception {
            stacktrace: error.stack.as_deref().and_then(parse_v8_stack),
            ty: error.ty,
            value: error.message,
            ..Default::default()
        }]
        .into();

        self.capture_with_scope(event, scope);
        Ok(())
    }

    async fn capture_message(
        &self,
        message: Option<String>,
        scope: ScopeContext,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let event = Event {
            level: sentry_level(scope.level),
            message,
            ..Default::default()
        };

        self.capture_with_scope(event, scope);
        Ok(())
    }

    async fn add_breadcrumb(
        &self,
        breadcrumb: Breadcrumb,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.hub.add_breadcrumb(sentry::Breadcrumb {
            timestamp: breadcrumb.timestamp.unwrap_or_else(SystemTime::now),
            ty: breadcrumb.kind.as_str().to_owned(),
            category: Some(BREADCRUMB_CATEGORY.to_owned()),
            level: sentry_level(breadcrumb.level),
            message: breadcrumb.message,
            data: breadcrumb.data.into_iter().collect(),
            ..Default::default()
        });
        Ok(())
    }

    async fn log(
        &self,
        level: RemoteLogLevel,
        message: Option<String>,
        data: Map<String, Value>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let timestamp = data
            .get("time")
            .and_then(Value::as_i64)
            .and_then(millis_to_time)
            .unwrap_or_else(SystemTime::now);

        self.hub.capture_log(Log {
            level: sentry_log_level(level),
            body: message.unwrap_or_default(),
            trace_id: None,
            timestamp,
            severity_number: None,
            attributes: data
                .into_iter()
                .map(|(key, value)| (key, log_attribute(value)))
                .collect(),
        });
        Ok(())
    }

    async fn flush(&self, timeout: Duration) -> Result<(), Box<dyn Error + Send + Sync>> {
        let Some(client) = self.hub.client() else {
            return Ok(());
        };

        let flushed = tokio::task::spawn_blocking(move || client.flush(Some(timeout))).await?;
        if flushed {
            Ok(())
        } else {
            Err(format!("sentry client did not flush within {timeout:?}").into())
        }
    }
}
