//! Actix-web middleware writing one structured access log record per request, with the severity
//! and message selected by the status class of the response.
//!
//! # Examples:
//! ## By default middleware uses the standard `log` crate for logging.
//! ```bash
//! cargo add actix-web-middleware-reqlog
//! ```
//! Example usage with standard `log` crate and `structured_logger` crate:
//! ```rust,no_run
//! use actix_web::{web, App, HttpServer};
//! use actix_web_middleware_reqlog::RequestLogger;
//! use structured_logger::{Builder, async_json::new_writer};
//!
//! #[actix_web::main] // or #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     Builder::new()
//!         .with_target_writer("*", new_writer(tokio::io::stdout()))
//!         .init();
//!
//!     HttpServer::new(|| {
//!         App::new()
//!             .wrap(RequestLogger::default())
//!             .route("/", web::get().to(|| async { "Hello world!" }))
//!     })
//!     .bind("127.0.0.1:8080")?
//!     .run()
//!     .await
//! }
//! ```
//! A request answered with `200` produces a record like:
//! ```json
//! {"level":"INFO","message":"Success","method":"GET","path":"/","status":"200","latency":"0.000081","error":null,"errorTraceId":"0195f6c4-7a3e-7cc1-9a0e-3f1d2c4b5a69"}
//! ```
//! and the response carries the same id in its `errorTraceID` header.
//!
//! # Status classes
//!
//! | status | slot | default severity | default message |
//! |---|---|---|---|
//! | 500 and above | 0 | `error` | `Server error` |
//! | 400 to 499 | 1 | `warn` | `Client error` |
//! | anything else | 2 | `info` | `Success` |
//!
//! Lists shorter than three entries are clamped, so a single severity applies to every class.
//! [`Severity::Disabled`] and [`Severity::NoLevel`] switch logging off for their class.
//!
//! # Configuration
//!
//! ```rust
//! use actix_web_middleware_reqlog::{Fields, Options, RequestLogger, Severity};
//!
//! let logger = RequestLogger::new(
//!     Options::new()
//!         .skip_path("/health")                   // exact path, never logged
//!         .skip_pattern(r"^/assets/.*")           // regex, never logged
//!         .next(|req| req.headers().contains_key("x-no-log"))
//!         .levels([Severity::Error, Severity::Info, Severity::Disabled])
//!         .messages(["request failed", "request rejected", "ok"])
//!         .fields(
//!             Fields::builder()
//!                 .with_method()
//!                 .with_path()
//!                 .with_status()
//!                 .with_latency_millis()
//!                 .with_remote_addr()
//!                 .with_error()
//!                 .build(),
//!         ),
//! )
//! .unwrap();
//! ```
//!
//! ## Custom logger builder
//!
//! ```rust
//! use actix_web_middleware_reqlog::{Logger, Options, RequestLogger};
//!
//! let logger = RequestLogger::new(Options::new().logger(|outcome| {
//!     Logger::new()
//!         .with("http.method", outcome.method)
//!         .with("http.status", outcome.status().as_u16())
//!         .with("latency_us", outcome.latency.whole_microseconds())
//! }))
//! .unwrap();
//! ```
//!
//! ## Request context
//!
//! Handlers can attach their own fields to the record with [`UserContext`], and read the
//! correlation id from the request extensions as [`ErrorTraceId`]. Fields added to the context
//! by an inner middleware are logged even when that middleware fails with an error.
//!
//! # Available Fields
//!
//! - `method` - HTTP method (GET, POST, etc.)
//! - `status` - Response status code
//! - `path` - Request path
//! - `params` - Query parameters
//! - `route` - Matched route pattern
//! - `version` - HTTP protocol version
//! - `host` - Request host
//! - `remote_addr` - Client IP address
//! - `real_ip` - Client real IP (when behind proxy)
//! - `size` - Response size in bytes
//! - `latency` - Request latency in seconds
//! - `latency_ms` - Request latency in milliseconds
//! - `datetime` - Request start in RFC3339 format
//! - `user_agent` - Client user agent
//! - `referer` - Request referrer
//! - `error` - Error returned by the handler chain
//!
//! You can also log custom request headers, response headers, and environment variables.
//!
//! # Feature Flags
//!
//! - `log` (default) - Emit records through the standard `log` crate
//! - `uuid_v4` (default) - Use UUIDv4 for error trace ids
//! - `tracing-request-id` - Enable integration with `tracing-actix-web`'s request ID
//! - `uuid_v7` - Use UUIDv7 instead of UUIDv4 for error trace ids

mod config;
mod context;
mod fields;
mod level;
mod logger;
mod wrapper;

pub use crate::config::{
    ConfigError, DEFAULT_LEVELS, DEFAULT_LOG_TARGET, DEFAULT_MESSAGES, ErrorHandler,
    LoggerBuilder, NextFn, Options,
};
pub use crate::context::{ERROR_TRACE_ID_FIELD, ERROR_TRACE_ID_HEADER, ErrorTraceId, UserContext};
pub use crate::fields::{Field, Fields, FieldsBuilder, RequestOutcome};
pub use crate::level::{ParseSeverityError, Severity, StatusClass};
pub use crate::logger::{RequestLogger, RequestLoggerMiddlewareService, RequestLoggerResponse};
#[cfg(feature = "log")]
pub use crate::wrapper::rust_log;
pub use crate::wrapper::Logger;
