use std::borrow::Cow;

use crate::context::{ErrorTraceId, UserContext};
use crate::level::Severity;

/// A set of fields bound to one access log record.
///
/// Produced by the logger builder for every logged request. The middleware adds the
/// [`UserContext`] fields and the error trace id before emitting it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Logger {
    fields: Vec<(Cow<'static, str>, Option<String>)>,
}

impl Logger {
    pub fn new() -> Self {
        Logger { fields: Vec::new() }
    }

    pub fn with(mut self, key: impl Into<Cow<'static, str>>, value: impl ToString) -> Self {
        self.push(key, Some(value.to_string()));
        self
    }

    /// Adds a field that is logged as null when `value` is `None`.
    pub fn with_opt(mut self, key: impl Into<Cow<'static, str>>, value: Option<String>) -> Self {
        self.push(key, value);
        self
    }

    pub(crate) fn push(&mut self, key: impl Into<Cow<'static, str>>, value: Option<String>) {
        self.fields.push((key.into(), value));
    }

    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(k, v)| (k.as_ref(), v.as_deref()))
    }

    /// Emits one record at `severity`. Disabled severities emit nothing.
    #[track_caller]
    pub(crate) fn emit(
        &self,
        target: &str,
        severity: Severity,
        message: &str,
        context: Option<&UserContext>,
        trace_id: ErrorTraceId,
    ) {
        #[cfg(feature = "log")]
        {
            let Some(level) = severity.log_level() else {
                return;
            };

            let context = context.map(UserContext::fields);

            let mut kvs: Vec<(&str, log::kv::Value)> = self
                .fields
                .iter()
                .map(|(k, v)| match v {
                    Some(v) => (k.as_ref(), log::kv::Value::from_display(v)),
                    None => (k.as_ref(), log::kv::Value::null()),
                })
                .collect();

            if let Some(context) = &context {
                kvs.extend(
                    context
                        .iter()
                        .map(|(k, v)| (k.as_ref(), log::kv::Value::from(v.as_str()))),
                );
            }

            if matches!(severity, Severity::Fatal | Severity::Panic) {
                kvs.push(("severity", log::kv::Value::from(severity.as_str())));
            }

            kvs.push((
                crate::context::ERROR_TRACE_ID_FIELD,
                log::kv::Value::from_display(&trace_id),
            ));

            rust_log::log(
                level,
                target,
                module_path!(),
                std::panic::Location::caller(),
                message,
                &kvs,
            );
        }

        #[cfg(not(feature = "log"))]
        let _ = (target, severity, message, context, trace_id);
    }
}

#[cfg(feature = "log")]
pub mod rust_log {
    use std::panic::Location;

    pub fn log(
        level: log::Level,
        target: &str,
        module_path: &'static str,
        loc: &'static Location,
        message: &str,
        kvs: &[(&str, log::kv::Value)],
    ) {
        // format_args! with a captured value must be consumed within the same statement
        log::logger().log(
            &log::Record::builder()
                .args(format_args!("{message}"))
                .level(level)
                .target(target)
                .module_path_static(Some(module_path))
                .file_static(Some(loc.file()))
                .line(Some(loc.line()))
                .key_values(&kvs)
                .build(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_fields() {
        let logger = Logger::new()
            .with("method", "GET")
            .with("status", 404)
            .with_opt("error", None);

        assert_eq!(logger.get("method"), Some(Some("GET")));
        assert_eq!(logger.get("status"), Some(Some("404")));
        assert_eq!(logger.get("error"), Some(None));
        assert_eq!(logger.get("path"), None);

        let keys: Vec<&str> = logger.fields().map(|(k, _)| k).collect();
        assert_eq!(keys, ["method", "status", "error"]);
    }
}
