//! Routes structured pino log records to Sentry.
//!
//! A [`LogRouter`](router::LogRouter) consumes newline-delimited JSON
//! records from a [`RecordSource`](source::RecordSource) and forwards each
//! one, depending on its level and content, as a captured exception, a
//! captured message, a breadcrumb, or a structured log entry.

pub mod config;
pub mod env;
pub mod init;
pub mod level;
pub mod memory_sink;
pub mod path;
pub mod record;
pub mod router;
pub mod scope;
pub mod sink;
pub mod source;

#[cfg(feature = "sentry")]
pub mod sentry_sink;
#[cfg(feature = "sentry")]
pub mod stacktrace;
