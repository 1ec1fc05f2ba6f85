use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Output format of the transport's own diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Install the global `tracing` subscriber for diagnostics.
///
/// Diagnostics always go to stderr. `RUST_LOG` takes precedence over
/// `default_filter` when set.
///
/// **Returns**
/// - `Err(..)` if a global subscriber was already installed.
pub fn init_tracing(format: LogFormat, default_filter: &str) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = Registry::default().with(filter);

    // The two formats produce different layer types, so the subscriber is
    // assembled in both variants.
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    }
}

#[cfg(feature = "sentry")]
pub use self::reporting::init_reporting;

#[cfg(feature = "sentry")]
mod reporting {
    use crate::config::{ConfigError, TransportOptions};
    use sentry::types::Dsn;
    use sentry::{ClientInitGuard, ClientOptions, Hub};
    use std::sync::OnceLock;
    use tracing::{debug, info};

    static REPORTING: OnceLock<()> = OnceLock::new();

    /// Initialize the Sentry client for this process, at most once.
    ///
    /// Nothing happens when a client is already bound to the main hub or a
    /// previous call initialized one. Structured logs are enabled when the
    /// options select the Sentry logger.
    ///
    /// **Returns**
    /// - `Ok(Some(guard))` for the call that initialized the client. Dropping
    ///   the guard flushes and shuts the client down.
    /// - `Ok(None)` if a client already existed.
    /// - `Err(..)` if the configured DSN is invalid.
    pub fn init_reporting(
        options: &TransportOptions,
    ) -> Result<Option<ClientInitGuard>, ConfigError> {
        if Hub::main().client().is_some() {
            debug!("sentry client already bound, skipping initialization");
            return Ok(None);
        }

        let dsn = match options.sentry.dsn.as_deref() {
            Some(dsn) => Some(dsn.parse::<Dsn>().map_err(|_| ConfigError::InvalidValue {
                key: "sentry.dsn",
                value: dsn.to_owned(),
            })?),
            None => None,
        };

        let mut guard = None;
        REPORTING.get_or_init(|| {
            info!(
                enabled = dsn.is_some(),
                sentry_logger = options.use_sentry_logger,
                "initializing sentry client"
            );
            guard = Some(sentry::init(ClientOptions {
                dsn,
                environment: options.sentry.environment.clone().map(Into::into),
                release: options.sentry.release.clone().map(Into::into),
                debug: options.sentry.debug,
                sample_rate: options.sentry.sample_rate.unwrap_or(1.0),
                enable_logs: options.use_sentry_logger,
                ..Default::default()
            }));
        });

        Ok(guard)
    }

}
