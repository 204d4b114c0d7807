use std::{borrow::Cow, collections::HashSet, fmt};

use actix_web::dev::ServiceRequest;
use actix_web::{Error, HttpResponse};
use regex::Regex;

use crate::fields::{Fields, RequestOutcome};
use crate::level::Severity;
use crate::wrapper::Logger;

/// Severities for the server error, client error and success classes.
pub const DEFAULT_LEVELS: [Severity; 3] = [Severity::Error, Severity::Warn, Severity::Info];

/// Messages for the server error, client error and success classes.
pub const DEFAULT_MESSAGES: [&str; 3] = ["Server error", "Client error", "Success"];

pub const DEFAULT_LOG_TARGET: &str = "actix_web_middleware_reqlog::logger";

/// Returns `true` for requests that must bypass the middleware.
pub type NextFn = Box<dyn Fn(&ServiceRequest) -> bool>;

/// Builds the [`Logger`] for a completed request.
pub type LoggerBuilder = Box<dyn Fn(&RequestOutcome<'_>) -> Logger>;

/// Translates an error returned by the inner service into a response.
pub type ErrorHandler = Box<dyn Fn(&Error) -> Result<HttpResponse, Error>>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one severity must be configured")]
    EmptyLevels,
    #[error("at least one message must be configured")]
    EmptyMessages,
    #[error("invalid skip pattern: {0}")]
    InvalidSkipPattern(#[from] regex::Error),
}

/// Options of the [`RequestLogger`](crate::RequestLogger) middleware.
///
/// Every option left unset falls back to its default when the middleware is built.
///
/// ```rust
/// use actix_web_middleware_reqlog::{Options, RequestLogger, Severity};
///
/// let logger = RequestLogger::new(
///     Options::new()
///         .skip_path("/health")
///         .levels([Severity::Error, Severity::Warn, Severity::Debug]),
/// )
/// .unwrap();
/// ```
#[derive(Default)]
pub struct Options {
    /// Bypass predicate, checked before the skip paths.
    pub next: Option<NextFn>,
    /// Exact request paths that are never logged.
    pub skip_paths: Option<Vec<String>>,
    /// Regex patterns of request paths that are never logged.
    pub skip_patterns: Option<Vec<String>>,
    /// Severities for the server error, client error and success classes.
    ///
    /// A shorter list is clamped: missing classes use the last entry.
    pub levels: Option<Vec<Severity>>,
    /// Messages for the server error, client error and success classes, clamped like `levels`.
    pub messages: Option<Vec<String>>,
    /// Fields rendered by the default logger builder. Ignored when `logger` is set.
    pub fields: Option<Fields>,
    pub logger: Option<LoggerBuilder>,
    /// Applied to errors returned by the inner service. Handler errors that actix-web already
    /// turned into a response are logged as they are.
    pub error_handler: Option<ErrorHandler>,
    pub log_target: Option<Cow<'static, str>>,
}

impl Options {
    pub fn new() -> Self {
        Options::default()
    }

    pub fn next<F>(mut self, next: F) -> Self
    where
        F: Fn(&ServiceRequest) -> bool + 'static,
    {
        self.next = Some(Box::new(next));
        self
    }

    /// Ignore and do not log access info for specified path.
    pub fn skip_path(mut self, path: impl Into<String>) -> Self {
        self.skip_paths
            .get_or_insert_with(Vec::new)
            .push(path.into());
        self
    }

    /// Ignore and do not log access info for paths that match regex.
    pub fn skip_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.skip_patterns
            .get_or_insert_with(Vec::new)
            .push(pattern.into());
        self
    }

    pub fn levels(mut self, levels: impl IntoIterator<Item = Severity>) -> Self {
        self.levels = Some(levels.into_iter().collect());
        self
    }

    pub fn messages<I, M>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.messages = Some(messages.into_iter().map(Into::into).collect());
        self
    }

    pub fn fields(mut self, fields: Fields) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn logger<F>(mut self, builder: F) -> Self
    where
        F: Fn(&RequestOutcome<'_>) -> Logger + 'static,
    {
        self.logger = Some(Box::new(builder));
        self
    }

    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Error) -> Result<HttpResponse, Error> + 'static,
    {
        self.error_handler = Some(Box::new(handler));
        self
    }

    /// Sets the logging target to `target`.
    ///
    /// By default, the log target is `actix_web_middleware_reqlog::logger`.
    pub fn log_target(mut self, target: impl Into<Cow<'static, str>>) -> Self {
        self.log_target = Some(target.into());
        self
    }
}

/// Validated middleware configuration, shared read-only by all requests of a worker.
pub(crate) struct Config {
    pub(crate) next: Option<NextFn>,
    pub(crate) skip: HashSet<String>,
    pub(crate) skip_regex: Vec<Regex>,
    pub(crate) levels: Vec<Severity>,
    pub(crate) messages: Vec<String>,
    pub(crate) logger: LoggerBuilder,
    pub(crate) error_handler: ErrorHandler,
    pub(crate) log_target: Cow<'static, str>,
}

impl Config {
    pub(crate) fn new(options: Options) -> Result<Config, ConfigError> {
        let Options {
            next,
            skip_paths,
            skip_patterns,
            levels,
            messages,
            fields,
            logger,
            error_handler,
            log_target,
        } = options;

        let levels = levels.unwrap_or_else(|| DEFAULT_LEVELS.to_vec());
        if levels.is_empty() {
            return Err(ConfigError::EmptyLevels);
        }

        let messages = messages.unwrap_or_else(default_messages);
        if messages.is_empty() {
            return Err(ConfigError::EmptyMessages);
        }

        let skip_regex = skip_patterns
            .unwrap_or_default()
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let logger = logger.unwrap_or_else(|| fields_logger(fields.unwrap_or_default()));

        Ok(Config {
            next,
            skip: skip_paths.unwrap_or_default().into_iter().collect(),
            skip_regex,
            levels,
            messages,
            logger,
            error_handler: error_handler.unwrap_or_else(|| Box::new(default_error_handler)),
            log_target: log_target.unwrap_or(Cow::Borrowed(DEFAULT_LOG_TARGET)),
        })
    }

    /// Bypass predicate first, then exact paths, then patterns.
    pub(crate) fn is_skipped(&self, req: &ServiceRequest) -> bool {
        if let Some(next) = &self.next {
            if next(req) {
                return true;
            }
        }

        let path = req.path();
        self.skip.contains(path) || self.skip_regex.iter().any(|r| r.is_match(path))
    }

    pub(crate) fn level(&self, index: usize) -> Severity {
        pick(&self.levels, index)
            .copied()
            .unwrap_or(Severity::NoLevel)
    }

    pub(crate) fn message(&self, index: usize) -> &str {
        pick(&self.messages, index).map_or("", String::as_str)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            next: None,
            skip: HashSet::new(),
            skip_regex: Vec::new(),
            levels: DEFAULT_LEVELS.to_vec(),
            messages: default_messages(),
            logger: fields_logger(Fields::default()),
            error_handler: Box::new(default_error_handler),
            log_target: Cow::Borrowed(DEFAULT_LOG_TARGET),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("next", &self.next.is_some())
            .field("skip", &self.skip)
            .field("skip_regex", &self.skip_regex)
            .field("levels", &self.levels)
            .field("messages", &self.messages)
            .field("log_target", &self.log_target)
            .finish_non_exhaustive()
    }
}

fn default_messages() -> Vec<String> {
    DEFAULT_MESSAGES.iter().map(|m| m.to_string()).collect()
}

/// Logger builder rendering `fields`, built once and shared by every request.
fn fields_logger(fields: Fields) -> LoggerBuilder {
    Box::new(move |outcome: &RequestOutcome<'_>| fields.render(outcome))
}

fn default_error_handler(err: &Error) -> Result<HttpResponse, Error> {
    Ok(err.error_response())
}

/// Returns `list[index]`, or the last element when `list` is shorter.
///
/// `None` only for an empty list, which [`Config::new`] rejects.
pub(crate) fn pick<T>(list: &[T], index: usize) -> Option<&T> {
    list.get(index).or_else(|| list.last())
}
