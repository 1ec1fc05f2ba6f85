use crate::level::RemoteLogLevel;
use crate::record::ReportedError;
use crate::scope::ScopeContext;
use crate::sink::{Breadcrumb, ReportSink};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One call received by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Exception {
        error: ReportedError,
        scope: ScopeContext,
    },
    Message {
        message: Option<String>,
        scope: ScopeContext,
    },
    Breadcrumb(Breadcrumb),
    Log {
        level: RemoteLogLevel,
        message: Option<String>,
        data: Map<String, Value>,
    },
}

/// A sink that keeps every call in memory, in arrival order.
///
/// Useful for tests and for embedding the router where records are
/// inspected in-process instead of reported.
#[derive(Default)]
pub struct MemorySink {
    calls: Mutex<Vec<Call>>,
    attempts: AtomicUsize,
    fail_on: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `n`-th call (zero based) fails instead of being recorded.
    pub fn failing_on(n: usize) -> Self {
        MemorySink {
            fail_on: Some(n),
            ..Self::default()
        }
    }

    /// Snapshot of the calls recorded so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn push(&self, call: Call) -> Result<(), Box<dyn Error + Send + Sync>> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed);
        if self.fail_on == Some(attempt) {
            return Err(format!("memory sink rejected call #{attempt}").into());
        }
        self.calls
            .lock()
            .map_err(|_| "memory sink lock poisoned")?
            .push(call);
        Ok(())
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn capture_exception(
        &self,
        error: ReportedError,
        scope: ScopeContext,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.push(Call::Exception { error, scope })
    }

    async fn capture_message(
        &self,
        message: Option<String>,
        scope: ScopeContext,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.push(Call::Message { message, scope })
    }

    async fn add_breadcrumb(
        &self,
        breadcrumb: Breadcrumb,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.push(Call::Breadcrumb(breadcrumb))
    }

    async fn log(
        &self,
        level: RemoteLogLevel,
        message: Option<String>,
        data: Map<String, Value>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.push(Call::Log {
            level,
            message,
            data,
        })
    }
}
