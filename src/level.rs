use std::fmt;

/// Severity vocabulary used when capturing events (exceptions, messages
/// and breadcrumbs).
///
/// `Log` sits between `Info` and `Warning` and is distinct from `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CaptureLevel {
    Debug,
    Info,
    Log,
    Warning,
    Error,
    Fatal,
}

impl CaptureLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            CaptureLevel::Debug => "debug",
            CaptureLevel::Info => "info",
            CaptureLevel::Log => "log",
            CaptureLevel::Warning => "warning",
            CaptureLevel::Error => "error",
            CaptureLevel::Fatal => "fatal",
        }
    }
}

impl fmt::Display for CaptureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity vocabulary of the structured remote-logging API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RemoteLogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl RemoteLogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteLogLevel::Debug => "debug",
            RemoteLogLevel::Info => "info",
            RemoteLogLevel::Warn => "warn",
            RemoteLogLevel::Error => "error",
            RemoteLogLevel::Fatal => "fatal",
        }
    }
}

impl fmt::Display for RemoteLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a pino numeric level onto the capture vocabulary.
///
/// Breakpoints follow pino's defaults (10 trace, 20 debug, 30 info, 40 warn,
/// 50 error, 60 fatal). Anything below 20, negative values included, is
/// `debug`.
pub fn capture_level(level: i64) -> CaptureLevel {
    match level {
        l if l >= 60 => CaptureLevel::Fatal,
        l if l >= 50 => CaptureLevel::Error,
        l if l >= 40 => CaptureLevel::Warning,
        l if l >= 30 => CaptureLevel::Log,
        l if l >= 20 => CaptureLevel::Info,
        _ => CaptureLevel::Debug,
    }
}

/// Map a pino numeric level onto the remote-logging vocabulary.
///
/// Unlike [`capture_level`] there is no separate tier for 30-39: the whole
/// 20-39 band is `info`.
pub fn remote_log_level(level: i64) -> RemoteLogLevel {
    match level {
        l if l >= 60 => RemoteLogLevel::Fatal,
        l if l >= 50 => RemoteLogLevel::Error,
        l if l >= 40 => RemoteLogLevel::Warn,
        l if l >= 20 => RemoteLogLevel::Info,
        _ => RemoteLogLevel::Debug,
    }
}
