use crate::config::RouterConfig;
use crate::level::{capture_level, remote_log_level};
use crate::record::{is_truthy, value_to_text, LogRecord, ReportedError};
use crate::scope::{enrich, ScopeContext};
use crate::sink::{Breadcrumb, BreadcrumbKind, ReportSink};
use crate::source::RecordSource;
use std::error::Error;
use std::future::Future;
use std::io;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tracing::{debug, error, trace, warn};

/// Shared counters describing the router's progress.
///
/// The counters are reference counted so they can be observed from another
/// task while [`LogRouter::run`] is consuming a stream.
#[derive(Clone, Debug, Default)]
pub struct RouterMetrics {
    /// Records pulled from the stream, the terminating `null` excluded.
    pub received: Arc<AtomicU64>,
    /// Records below the level threshold or without a level.
    pub dropped: Arc<AtomicU64>,
    /// Records accepted by the sink.
    pub dispatched: Arc<AtomicU64>,
    /// Records whose backend call failed or timed out.
    pub failed: Arc<AtomicU64>,
    /// Records that were not JSON objects.
    pub malformed: Arc<AtomicU64>,
}

impl RouterMetrics {
    pub fn summary(&self) -> RouterSummary {
        RouterSummary {
            received: self.received.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RouterMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouterSummary {
    pub received: u64,
    pub dropped: u64,
    pub dispatched: u64,
    pub failed: u64,
    pub malformed: u64,
}

/// The backend operation a record was routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Log,
    Breadcrumb,
    Exception,
    Message,
}

/// Error returned when a single record could not be delivered.
#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error("backend call failed")]
    Backend(#[source] Box<dyn Error + Send + Sync>),

    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
}

/// Error ending [`LogRouter::run`] before the stream was exhausted.
#[derive(thiserror::Error, Debug)]
pub enum RouterError {
    #[error("record stream failed after {} records", .summary.received)]
    Stream {
        #[source]
        source: io::Error,
        summary: RouterSummary,
    },
}

/// Routes pino records to a [`ReportSink`].
///
/// Every record at or above the configured level goes to exactly one
/// backend operation:
///
/// 1. structured logs, when `use_sentry_logger` is set;
/// 2. otherwise, for records carrying an error, an error breadcrumb or a
///    captured exception;
/// 3. otherwise a default breadcrumb or a captured message.
///
/// Failures are contained per record: a failed backend call is logged and
/// counted, and routing continues with the next record.
pub struct LogRouter {
    sink: Arc<dyn ReportSink>,
    config: RouterConfig,
    metrics: RouterMetrics,
}

impl LogRouter {
    pub fn new(sink: Arc<dyn ReportSink>, config: RouterConfig) -> Self {
        LogRouter {
            sink,
            config,
            metrics: RouterMetrics::default(),
        }
    }

    /// Handles to the live counters.
    pub fn metrics(&self) -> RouterMetrics {
        self.metrics.clone()
    }

    /// Consume `source` one record at a time until it ends.
    ///
    /// **Returns**
    /// - `Ok(summary)` when the stream was exhausted or yielded `null`.
    /// - `Err(RouterError::Stream)` when reading from the stream failed.
    ///   Records routed before the failure stay delivered.
    pub async fn run<S>(&self, source: &mut S) -> Result<RouterSummary, RouterError>
    where
        S: RecordSource + ?Sized,
    {
        loop {
            let value = match source.next_record().await {
                Ok(Some(value)) => value,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "record stream failed");
                    return Err(RouterError::Stream {
                        source: e,
                        summary: self.metrics.summary(),
                    });
                }
            };

            if value.is_null() {
                debug!("received null record, ending stream");
                break;
            }

            self.metrics.received.fetch_add(1, Ordering::Relaxed);

            let Some(record) = LogRecord::from_value(value) else {
                self.metrics.malformed.fetch_add(1, Ordering::Relaxed);
                warn!("dropping record that is not a JSON object");
                continue;
            };

            let message_key = source.message_key().to_owned();
            let error_key = source.error_key().to_owned();

            match self.route(&record, &message_key, &error_key).await {
                Ok(Some(dispatch)) => {
                    self.metrics.dispatched.fetch_add(1, Ordering::Relaxed);
                    trace!(?dispatch, level = ?record.level(), "record dispatched");
                }
                Ok(None) => {
                    self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.metrics.failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        error = &e as &dyn Error,
                        level = ?record.level(),
                        "failed to dispatch log record"
                    );
                }
            }
        }

        let summary = self.metrics.summary();
        debug!(?summary, "record stream ended");
        Ok(summary)
    }

    /// Route a single record.
    ///
    /// **Returns**
    /// - `Ok(None)` if the record is below the level threshold (nothing is
    ///   sent).
    /// - `Ok(Some(dispatch))` naming the backend operation that accepted it.
    /// - `Err(..)` if that operation failed or timed out.
    pub async fn route(
        &self,
        record: &LogRecord,
        message_key: &str,
        error_key: &str,
    ) -> Result<Option<Dispatch>, DispatchError> {
        let Some(level) = record.level().filter(|level| *level >= self.config.min_level) else {
            return Ok(None);
        };

        if self.config.use_sentry_logger {
            let mut data = record.fields().clone();
            let trace_id = data.remove("trace_id");
            let message = data.remove(message_key).as_ref().and_then(value_to_text);
            if let Some(trace_id) = trace_id.filter(is_truthy) {
                data.insert("trace".to_owned(), trace_id);
            }

            self.call(self.sink.log(remote_log_level(level), message, data))
                .await?;
            return Ok(Some(Dispatch::Log));
        }

        let serialized_error = record.error(error_key);

        if self.config.send_breadcrumbs {
            let kind = match serialized_error {
                Some(_) => BreadcrumbKind::Error,
                None => BreadcrumbKind::Default,
            };
            let breadcrumb = Breadcrumb {
                kind,
                level: capture_level(level),
                message: record.message(message_key),
                data: record.fields().clone(),
                timestamp: record.time(),
            };

            self.call(self.sink.add_breadcrumb(breadcrumb)).await?;
            return Ok(Some(Dispatch::Breadcrumb));
        }

        let mut scope = ScopeContext::default();
        enrich(&mut scope, record, &self.config);

        match serialized_error {
            Some(serialized) => {
                let error = ReportedError::from_serialized(serialized);
                self.call(self.sink.capture_exception(error, scope)).await?;
                Ok(Some(Dispatch::Exception))
            }
            None => {
                let message = record.message(message_key);
                self.call(self.sink.capture_message(message, scope)).await?;
                Ok(Some(Dispatch::Message))
            }
        }
    }

    async fn call<F>(&self, fut: F) -> Result<(), DispatchError>
    where
        F: Future<Output = Result<(), Box<dyn Error + Send + Sync>>>,
    {
        match self.config.dispatch_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result.map_err(DispatchError::Backend),
                Err(_) => Err(DispatchError::Timeout(limit)),
            },
            None => fut.await.map_err(DispatchError::Backend),
        }
    }
}
