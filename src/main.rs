use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use pino_sentry_transport::config::TransportOptions;
use pino_sentry_transport::init::{init_reporting, init_tracing, LogFormat};
use pino_sentry_transport::router::LogRouter;
use pino_sentry_transport::sentry_sink::SentrySink;
use pino_sentry_transport::sink::ReportSink;
use pino_sentry_transport::source::{LineSource, DEFAULT_MAX_LINE_LENGTH};

/// Time given to the Sentry client to send queued events on exit.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(name = "pino-sentry")]
#[command(about = "Forward pino logs read from stdin to Sentry")]
struct Cli {
    /// JSON options file. Environment variables override its values.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Drop records below this pino level.
    #[arg(long)]
    min_level: Option<i64>,

    /// Record breadcrumbs instead of capturing events.
    #[arg(long)]
    breadcrumbs: bool,

    /// Forward records to Sentry structured logs.
    #[arg(long)]
    sentry_logger: bool,

    /// Expect a leading `pinoConfig` line carrying the message and error keys.
    #[arg(long)]
    expect_pino_config: bool,

    /// Name of the message field.
    #[arg(long)]
    message_key: Option<String>,

    /// Name of the serialized error field.
    #[arg(long)]
    error_key: Option<String>,

    /// Skip input lines longer than this many bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    max_line_length: usize,

    /// Format of the transport's own diagnostics on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn load_options(cli: &Cli) -> Result<TransportOptions, Box<dyn Error>> {
    let mut options = match &cli.config {
        Some(path) => TransportOptions::from_path(path)?,
        None => TransportOptions::default(),
    };
    options.apply_env()?;

    if let Some(level) = cli.min_level {
        options.min_level = level;
    }
    options.send_breadcrumbs |= cli.breadcrumbs;
    options.use_sentry_logger |= cli.sentry_logger;
    options.expect_pino_config |= cli.expect_pino_config;

    Ok(options)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    // A subscriber installed by an embedding process is fine to keep.
    let _ = init_tracing(cli.log_format, "info");

    let options = match load_options(&cli) {
        Ok(options) => options,
        Err(e) => {
            error!(error = e.as_ref() as &dyn Error, "invalid configuration");
            return ExitCode::from(2);
        }
    };

    let guard = match init_reporting(&options) {
        Ok(guard) => guard,
        Err(e) => {
            error!(error = &e as &dyn Error, "failed to initialize sentry");
            return ExitCode::from(2);
        }
    };

    let sink = Arc::new(SentrySink::main());
    let router = LogRouter::new(sink.clone(), options.router_config());

    let mut source = LineSource::stdin()
        .expect_pino_config(options.expect_pino_config)
        .with_max_line_length(cli.max_line_length);
    if let Some(key) = &cli.message_key {
        source = source.with_message_key(key.as_str());
    }
    if let Some(key) = &cli.error_key {
        source = source.with_error_key(key.as_str());
    }

    let result = router.run(&mut source).await;

    if let Err(e) = sink.flush(FLUSH_TIMEOUT).await {
        warn!(error = e.as_ref() as &dyn Error, "failed to flush sentry client");
    }
    drop(guard);

    match result {
        Ok(summary) => {
            info!(
                received = summary.received,
                dispatched = summary.dispatched,
                dropped = summary.dropped,
                failed = summary.failed,
                malformed = summary.malformed,
                skipped_lines = source.skipped_lines(),
                "log stream ended"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = &e as &dyn Error, "log stream aborted");
            ExitCode::FAILURE
        }
    }
}
