/// Environment variable names used by this crate for configuring the
/// transport without an options file.
///
/// These are purely helpers; the router itself never reads the
/// environment.

/// Sentry DSN. Overrides `sentry.dsn` from the options file.
pub const SENTRY_DSN_ENV: &str = "SENTRY_DSN";

/// Sentry environment name.
pub const SENTRY_ENVIRONMENT_ENV: &str = "SENTRY_ENVIRONMENT";

/// Sentry release identifier.
pub const SENTRY_RELEASE_ENV: &str = "SENTRY_RELEASE";

/// Minimum pino level that is forwarded.
pub const MIN_LEVEL_ENV: &str = "PINO_SENTRY_MIN_LEVEL";

/// Comma-separated field paths promoted to tags.
pub const TAGS_ENV: &str = "PINO_SENTRY_TAGS";

/// Comma-separated field paths collected into the `pino-context` block.
pub const CONTEXT_ENV: &str = "PINO_SENTRY_CONTEXT";

/// `true` to attach the whole record as context.
pub const WITH_LOG_RECORD_ENV: &str = "PINO_SENTRY_WITH_LOG_RECORD";

/// `true` to record breadcrumbs instead of capturing events.
pub const SEND_BREADCRUMBS_ENV: &str = "PINO_SENTRY_SEND_BREADCRUMBS";

/// `true` to forward records to Sentry structured logs.
pub const USE_SENTRY_LOGGER_ENV: &str = "PINO_SENTRY_USE_SENTRY_LOGGER";

/// Read an environment variable, treating unset and empty the same.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Split a comma-separated list, dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("a, b.c,,d "), vec!["a", "b.c", "d"]);
        assert!(split_list("").is_empty());
    }
}
