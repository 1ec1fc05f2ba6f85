use std::error::Error;
use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pino_sentry_transport::config::RouterConfig;
use pino_sentry_transport::level::{CaptureLevel, RemoteLogLevel};
use pino_sentry_transport::memory_sink::{Call, MemorySink};
use pino_sentry_transport::record::ReportedError;
use pino_sentry_transport::router::{LogRouter, RouterError, RouterSummary};
use pino_sentry_transport::scope::{ScopeContext, LOG_RECORD_CONTEXT, PINO_CONTEXT};
use pino_sentry_transport::sink::{Breadcrumb, ReportSink};
use pino_sentry_transport::source::{LineSource, RecordSource};
use serde_json::{json, Map, Value};

fn lines(values: &[Value]) -> Vec<u8> {
    let mut out = Vec::new();
    for value in values {
        out.extend_from_slice(value.to_string().as_bytes());
        out.push(b'\n');
    }
    out
}

async fn run_lines(config: RouterConfig, input: &[u8]) -> (Vec<Call>, RouterSummary) {
    let sink = Arc::new(MemorySink::new());
    let router = LogRouter::new(sink.clone(), config);
    let mut source = LineSource::new(input);
    let summary = router.run(&mut source).await.unwrap();
    (sink.calls(), summary)
}

#[tokio::test]
async fn routes_exception_with_enriched_scope() {
    let config = RouterConfig {
        min_level: 10,
        with_log_record: true,
        tags: vec!["req.id".into(), "absent".into()],
        context: vec!["user.name".into(), "items[0]".into()],
        ..Default::default()
    };
    let record = json!({
        "level": 50,
        "msg": "boom",
        "err": { "type": "Error", "message": "x", "stack": "s1" },
        "req": { "id": "r-1" },
        "user": { "name": "ann" },
        "items": ["first", "second"],
    });

    let (calls, summary) = run_lines(config, &lines(&[record.clone()])).await;

    assert_eq!(summary.dispatched, 1);
    match calls.as_slice() {
        [Call::Exception { error, scope }] => {
            assert_eq!(
                error,
                &ReportedError {
                    ty: "Error".into(),
                    message: Some("x".into()),
                    stack: Some("s1".into()),
                }
            );
            assert_eq!(scope.level, CaptureLevel::Error);
            assert_eq!(scope.tags["req.id"].as_deref(), Some("r-1"));
            assert_eq!(scope.tags["absent"], None);
            assert_eq!(
                Value::Object(scope.contexts[LOG_RECORD_CONTEXT].clone()),
                record
            );
            let context = &scope.contexts[PINO_CONTEXT];
            assert_eq!(context["user.name"], json!("ann"));
            assert_eq!(context["items[0]"], json!("first"));
        }
        calls => panic!("unexpected calls: {calls:?}"),
    }
}

#[tokio::test]
async fn null_record_ends_the_stream() {
    let input = b"null\n{\"level\":60,\"msg\":\"never\"}\n";
    let (calls, summary) = run_lines(RouterConfig::default(), input).await;

    assert!(calls.is_empty());
    assert_eq!(summary, RouterSummary::default());
}

#[tokio::test]
async fn threshold_and_malformed_records() {
    let input = lines(&[
        json!({ "level": 20, "msg": "debug" }),
        json!("a bare string"),
        json!({ "level": 40, "msg": "warn" }),
        json!({ "msg": "no level" }),
    ]);
    let config = RouterConfig {
        min_level: 30,
        ..Default::default()
    };

    let (calls, summary) = run_lines(config, &input).await;

    assert_eq!(
        summary,
        RouterSummary {
            received: 4,
            dropped: 2,
            dispatched: 1,
            failed: 0,
            malformed: 1,
        }
    );
    match calls.as_slice() {
        [Call::Message { message, scope }] => {
            assert_eq!(message.as_deref(), Some("warn"));
            assert_eq!(scope.level, CaptureLevel::Warning);
        }
        calls => panic!("unexpected calls: {calls:?}"),
    }
}

#[tokio::test]
async fn failed_dispatch_does_not_stop_the_stream() {
    let sink = Arc::new(MemorySink::failing_on(0));
    let router = LogRouter::new(sink.clone(), RouterConfig::default());
    let input = lines(&[
        json!({ "level": 50, "msg": "first" }),
        json!({ "level": 50, "msg": "second" }),
    ]);
    let mut source = LineSource::new(input.as_slice());
    let metrics = router.metrics();

    let summary = router.run(&mut source).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(metrics.failed.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.received.load(Ordering::Relaxed), 2);
    match sink.calls().as_slice() {
        [Call::Message { message, .. }] => assert_eq!(message.as_deref(), Some("second")),
        calls => panic!("unexpected calls: {calls:?}"),
    }
}

#[tokio::test]
async fn numeric_string_levels_are_compared_as_numbers() {
    let input = lines(&[
        json!({ "level": "50", "msg": "string level" }),
        json!({ "level": "30", "msg": "too low" }),
        json!({ "level": "loud", "msg": "not a level" }),
    ]);

    let config = RouterConfig {
        min_level: 40,
        ..Default::default()
    };
    let (calls, summary) = run_lines(config, &input).await;

    assert_eq!(summary.dispatched, 1);
    assert_eq!(summary.dropped, 2);
    match calls.as_slice() {
        [Call::Message { message, .. }] => assert_eq!(message.as_deref(), Some("string level")),
        calls => panic!("unexpected calls: {calls:?}"),
    }
}

#[tokio::test]
async fn pino_config_keys_apply_to_routing() {
    let input = lines(&[
        json!({ "pinoConfig": { "messageKey": "message", "errorKey": "error" } }),
        json!({ "level": 50, "message": "hello", "error": { "message": "bad" } }),
        json!({ "level": 30, "message": "plain", "err": { "message": "ignored" } }),
    ]);
    let sink = Arc::new(MemorySink::new());
    let router = LogRouter::new(sink.clone(), RouterConfig::default());
    let mut source = LineSource::new(input.as_slice()).expect_pino_config(true);

    router.run(&mut source).await.unwrap();

    match sink.calls().as_slice() {
        [Call::Exception { error, .. }, Call::Message { message, .. }] => {
            assert_eq!(error.message.as_deref(), Some("bad"));
            assert_eq!(message.as_deref(), Some("plain"));
        }
        calls => panic!("unexpected calls: {calls:?}"),
    }
}

#[tokio::test]
async fn sentry_logger_mode_renames_trace_id() {
    let config = RouterConfig {
        use_sentry_logger: true,
        ..Default::default()
    };
    let input = lines(&[json!({
        "level": 30,
        "msg": "request done",
        "trace_id": "4bf92f3577b34da6a3ce929d0e0e4736",
        "status": 200,
    })]);

    let (calls, _) = run_lines(config, &input).await;

    match calls.as_slice() {
        [Call::Log { level, message, data }] => {
            assert_eq!(*level, RemoteLogLevel::Info);
            assert_eq!(message.as_deref(), Some("request done"));
            assert_eq!(data["trace"], json!("4bf92f3577b34da6a3ce929d0e0e4736"));
            assert!(!data.contains_key("trace_id"));
            assert!(!data.contains_key("msg"));
            assert_eq!(data["status"], json!(200));
        }
        calls => panic!("unexpected calls: {calls:?}"),
    }
}

struct BrokenSource {
    remaining: Vec<Value>,
}

#[async_trait]
impl RecordSource for BrokenSource {
    async fn next_record(&mut self) -> io::Result<Option<Value>> {
        match self.remaining.pop() {
            Some(value) => Ok(Some(value)),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "producer went away")),
        }
    }
}

#[tokio::test]
async fn stream_failure_is_distinct_from_end() {
    let sink = Arc::new(MemorySink::new());
    let router = LogRouter::new(sink.clone(), RouterConfig::default());
    let mut source = BrokenSource {
        remaining: vec![json!({ "level": 40, "msg": "before failure" })],
    };

    let err = router.run(&mut source).await.unwrap_err();

    let RouterError::Stream { source, summary } = err;
    assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(sink.calls().len(), 1);
}

struct SlowSink;

#[async_trait]
impl ReportSink for SlowSink {
    async fn capture_exception(
        &self,
        _error: ReportedError,
        _scope: ScopeContext,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    }

    async fn capture_message(
        &self,
        _message: Option<String>,
        _scope: ScopeContext,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    }

    async fn add_breadcrumb(&self, _breadcrumb: Breadcrumb) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }

    async fn log(
        &self,
        _level: RemoteLogLevel,
        _message: Option<String>,
        _data: Map<String, Value>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

#[tokio::test]
async fn dispatch_timeout_counts_as_failure() {
    let config = RouterConfig {
        dispatch_timeout: Some(Duration::from_millis(20)),
        ..Default::default()
    };
    let router = LogRouter::new(Arc::new(SlowSink), config);
    let input = lines(&[
        json!({ "level": 50, "msg": "slow" }),
        json!({ "level": 30, "msg": "also slow" }),
    ]);
    let mut source = LineSource::new(input.as_slice());

    let summary = router.run(&mut source).await.unwrap();

    assert_eq!(summary.failed, 2);
    assert_eq!(summary.dispatched, 0);
}
