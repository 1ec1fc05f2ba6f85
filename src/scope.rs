use crate::config::RouterConfig;
use crate::level::{capture_level, CaptureLevel};
use crate::path;
use crate::record::{value_to_text, LogRecord};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Context block holding the complete record.
pub const LOG_RECORD_CONTEXT: &str = "pino-log-record";

/// Context block holding the configured context paths.
pub const PINO_CONTEXT: &str = "pino-context";

/// Enrichment applied to a single capture call.
///
/// Built fresh for every record and handed to the sink together with the
/// exception or message.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeContext {
    pub level: CaptureLevel,
    /// Tags keyed by their configured path. `None` means the path did not
    /// resolve; the tag is still set, without a value.
    pub tags: BTreeMap<String, Option<String>>,
    pub contexts: BTreeMap<String, Map<String, Value>>,
}

impl Default for ScopeContext {
    fn default() -> Self {
        ScopeContext {
            level: CaptureLevel::Debug,
            tags: BTreeMap::new(),
            contexts: BTreeMap::new(),
        }
    }
}

/// Populate `scope` from `record` according to `config`.
///
/// Sets the capture level, optionally attaches the full record, and
/// resolves the configured tag and context paths. Paths that do not
/// resolve never fail: tags get no value and context entries are left out.
pub fn enrich<'s>(
    scope: &'s mut ScopeContext,
    record: &LogRecord,
    config: &RouterConfig,
) -> &'s mut ScopeContext {
    scope.level = capture_level(record.level().unwrap_or(i64::MIN));

    if config.with_log_record {
        scope
            .contexts
            .insert(LOG_RECORD_CONTEXT.to_owned(), record.fields().clone());
    }

    for tag in &config.tags {
        let value = path::resolve(record.fields(), tag).and_then(value_to_text);
        scope.tags.insert(tag.clone(), value);
    }

    if !config.context.is_empty() {
        let mut context = Map::new();
        for field in &config.context {
            if let Some(value) = path::resolve(record.fields(), field) {
                context.insert(field.clone(), value.clone());
            }
        }
        scope.contexts.insert(PINO_CONTEXT.to_owned(), context);
    }

    scope
}
