use crate::env::{self, env_opt, split_list};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Routing policy of a [`LogRouter`](crate::router::LogRouter).
///
/// Built once and read-only for the lifetime of the router.
///
/// **Fields**
/// - `min_level`: records with a lower pino level are dropped.
/// - `with_log_record`: attach the whole record as the `pino-log-record`
///   context on captures.
/// - `tags`: field paths whose values become tags.
/// - `context`: field paths collected into the `pino-context` block.
/// - `use_sentry_logger`: forward records to structured logs instead of
///   capturing events or breadcrumbs.
/// - `send_breadcrumbs`: record breadcrumbs instead of capturing events.
/// - `dispatch_timeout`: upper bound for a single backend call. `None`
///   waits indefinitely.
#[derive(Clone, Debug, PartialEq)]
pub struct RouterConfig {
    pub min_level: i64,
    pub with_log_record: bool,
    pub tags: Vec<String>,
    pub context: Vec<String>,
    pub use_sentry_logger: bool,
    pub send_breadcrumbs: bool,
    pub dispatch_timeout: Option<Duration>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            min_level: 10,
            with_log_record: false,
            tags: Vec::new(),
            context: Vec::new(),
            use_sentry_logger: false,
            send_breadcrumbs: false,
            dispatch_timeout: None,
        }
    }
}

/// Options passed through to the Sentry client. Opaque to the router.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SentryOptions {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub release: Option<String>,
    pub debug: bool,
    pub sample_rate: Option<f32>,
}

/// The transport's option set as it appears in a JSON options file.
///
/// ```json
/// {
///   "sentry": { "dsn": "https://key@o0.ingest.sentry.io/0" },
///   "minLevel": 40,
///   "tags": ["req.id"],
///   "sendBreadcrumbs": false
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransportOptions {
    pub sentry: SentryOptions,
    pub min_level: i64,
    pub with_log_record: bool,
    pub tags: Vec<String>,
    pub context: Vec<String>,
    /// Deprecated and ignored. Initialization is skipped automatically when
    /// a client is already bound.
    pub skip_sentry_initialization: bool,
    pub expect_pino_config: bool,
    pub send_breadcrumbs: bool,
    pub use_sentry_logger: bool,
    /// Upper bound for a single backend call, in milliseconds.
    pub dispatch_timeout_ms: Option<u64>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        let router = RouterConfig::default();
        Self {
            sentry: SentryOptions::default(),
            min_level: router.min_level,
            with_log_record: router.with_log_record,
            tags: Vec::new(),
            context: Vec::new(),
            skip_sentry_initialization: false,
            expect_pino_config: false,
            send_breadcrumbs: router.send_breadcrumbs,
            use_sentry_logger: router.use_sentry_logger,
            dispatch_timeout_ms: None,
        }
    }
}

/// Errors raised while loading [`TransportOptions`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read options file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid options file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

impl TransportOptions {
    /// Load options from a JSON file. Missing fields take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Overlay values from the process environment.
    ///
    /// Only variables that are set and non-empty replace existing values.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(env_opt)
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(dsn) = var(env::SENTRY_DSN_ENV) {
            self.sentry.dsn = Some(dsn);
        }
        if let Some(environment) = var(env::SENTRY_ENVIRONMENT_ENV) {
            self.sentry.environment = Some(environment);
        }
        if let Some(release) = var(env::SENTRY_RELEASE_ENV) {
            self.sentry.release = Some(release);
        }
        if let Some(level) = var(env::MIN_LEVEL_ENV) {
            self.min_level = level.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: env::MIN_LEVEL_ENV,
                value: level.clone(),
            })?;
        }
        if let Some(tags) = var(env::TAGS_ENV) {
            self.tags = split_list(&tags);
        }
        if let Some(context) = var(env::CONTEXT_ENV) {
            self.context = split_list(&context);
        }
        if let Some(value) = var(env::WITH_LOG_RECORD_ENV) {
            self.with_log_record = parse_bool(env::WITH_LOG_RECORD_ENV, &value)?;
        }
        if let Some(value) = var(env::SEND_BREADCRUMBS_ENV) {
            self.send_breadcrumbs = parse_bool(env::SEND_BREADCRUMBS_ENV, &value)?;
        }
        if let Some(value) = var(env::USE_SENTRY_LOGGER_ENV) {
            self.use_sentry_logger = parse_bool(env::USE_SENTRY_LOGGER_ENV, &value)?;
        }
        Ok(())
    }

    /// The routing policy described by these options.
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            min_level: self.min_level,
            with_log_record: self.with_log_record,
            tags: self.tags.clone(),
            context: self.context.clone(),
            use_sentry_logger: self.use_sentry_logger,
            send_breadcrumbs: self.send_breadcrumbs,
            dispatch_timeout: self.dispatch_timeout_ms.map(Duration::from_millis),
        }
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let options = TransportOptions::default();
        assert_eq!(options.min_level, 10);
        assert!(!options.use_sentry_logger);
        assert_eq!(options.router_config(), RouterConfig::default());
    }

    #[test]
    fn test_parse_camel_case_options() {
        let options: TransportOptions = serde_json::from_str(
            r#"{
                "sentry": { "dsn": "https://key@o0.ingest.sentry.io/1", "sampleRate": 0.5 },
                "minLevel": 40,
                "withLogRecord": true,
                "tags": ["req.id"],
                "context": ["user.name"],
                "sendBreadcrumbs": true,
                "skipSentryInitialization": true,
                "dispatchTimeoutMs": 250
            }"#,
        )
        .unwrap();

        assert_eq!(options.sentry.sample_rate, Some(0.5));
        let config = options.router_config();
        assert_eq!(config.min_level, 40);
        assert!(config.with_log_record);
        assert!(config.send_breadcrumbs);
        assert_eq!(config.tags, vec!["req.id"]);
        assert_eq!(config.context, vec!["user.name"]);
        assert_eq!(config.dispatch_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "useSentryLogger": true }}"#).unwrap();

        let options = TransportOptions::from_path(file.path()).unwrap();
        assert!(options.use_sentry_logger);
        assert_eq!(options.min_level, 10);
    }

    #[test]
    fn test_from_path_errors() {
        let err = TransportOptions::from_path("/nonexistent/options.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = TransportOptions::from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_apply_vars() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (env::SENTRY_DSN_ENV, "https://key@o0.ingest.sentry.io/2"),
            (env::MIN_LEVEL_ENV, "50"),
            (env::TAGS_ENV, "a,b.c"),
            (env::SEND_BREADCRUMBS_ENV, "yes"),
        ]);

        let mut options = TransportOptions::default();
        options
            .apply_vars(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(options.sentry.dsn.as_deref(), Some("https://key@o0.ingest.sentry.io/2"));
        assert_eq!(options.min_level, 50);
        assert_eq!(options.tags, vec!["a", "b.c"]);
        assert!(options.send_breadcrumbs);
        assert!(!options.with_log_record);
    }

    #[test]
    fn test_apply_vars_rejects_bad_values() {
        let mut options = TransportOptions::default();
        let err = options
            .apply_vars(|key| (key == env::MIN_LEVEL_ENV).then(|| "loud".to_owned()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: env::MIN_LEVEL_ENV, .. }));

        let err = options
            .apply_vars(|key| (key == env::USE_SENTRY_LOGGER_ENV).then(|| "maybe".to_owned()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
