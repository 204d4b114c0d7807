use std::env;

use actix_http::ResponseHead;
use actix_web::body::BodySize;
use actix_web::http::{
    Method, StatusCode, Uri, Version,
    header::{AsHeaderName, HeaderName},
};
#[cfg(feature = "tracing-request-id")]
use actix_web::HttpMessage;
use actix_web::{Error, HttpRequest};
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};

use crate::context::ErrorTraceId;
use crate::wrapper::Logger;

/// Everything known about a request once the inner service has completed.
///
/// Passed to the logger builder. Borrowed from the in-flight response, it does not outlive the
/// request it describes.
#[derive(Debug)]
pub struct RequestOutcome<'a> {
    /// `None` when the inner service failed with an error and the request did not survive it.
    pub request: Option<&'a HttpRequest>,
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub version: Version,
    pub response: &'a ResponseHead,
    pub body_size: BodySize,
    pub start: OffsetDateTime,
    pub latency: Duration,
    /// Error returned by the handler chain, if any.
    pub error: Option<&'a Error>,
    pub trace_id: ErrorTraceId,
}

impl RequestOutcome<'_> {
    pub fn status(&self) -> StatusCode {
        self.response.status
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    fn request_header(&self, header: impl AsHeaderName) -> Option<String> {
        self.request
            .and_then(|req| req.headers().get(header))
            .map(|val| val.to_str().unwrap_or_default().to_string())
    }
}

/// Fields rendered by the default logger builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fields(Vec<Field>);

impl Default for Fields {
    /// Method, path, status, latency and error.
    fn default() -> Self {
        FieldsBuilder::default().build()
    }
}

impl Fields {
    pub fn builder() -> FieldsBuilder {
        FieldsBuilder::new()
    }

    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        let mut builder = FieldsBuilder::new();
        for field in fields {
            builder = builder.with(field);
        }
        builder.build()
    }

    pub fn contains(&self, field: &Field) -> bool {
        self.0.contains(field)
    }

    /// Renders every selected field into a new [`Logger`].
    pub fn render(&self, outcome: &RequestOutcome<'_>) -> Logger {
        let mut logger = Logger::new();
        for field in &self.0 {
            field.render(outcome, &mut logger);
        }
        logger
    }
}

pub struct FieldsBuilder {
    fields: Vec<Field>,
}

impl FieldsBuilder {
    pub fn new() -> Self {
        FieldsBuilder { fields: Vec::new() }
    }

    pub fn build(self) -> Fields {
        Fields(self.fields)
    }

    /// Adds `field` unless it is already selected. Fields render in insertion order.
    pub fn with(mut self, field: Field) -> Self {
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
        self
    }

    pub fn with_method(self) -> Self {
        self.with(Field::Method)
    }

    pub fn with_status(self) -> Self {
        self.with(Field::Status)
    }

    pub fn with_path(self) -> Self {
        self.with(Field::Path)
    }

    pub fn with_params(self) -> Self {
        self.with(Field::Params)
    }

    pub fn with_route(self) -> Self {
        self.with(Field::Route)
    }

    pub fn with_version(self) -> Self {
        self.with(Field::Version)
    }

    pub fn with_host(self) -> Self {
        self.with(Field::Host)
    }

    pub fn with_remote_addr(self) -> Self {
        self.with(Field::RemoteAddr)
    }

    pub fn with_real_ip(self) -> Self {
        self.with(Field::RealIp)
    }

    pub fn with_request_id(self, header: HeaderName) -> Self {
        self.with(Field::RequestId(header))
    }

    #[cfg(feature = "tracing-request-id")]
    pub fn with_tracing_request_id(self) -> Self {
        self.with(Field::TracingRequestId)
    }

    pub fn with_request_header(self, header: HeaderName) -> Self {
        self.with(Field::RequestHeader(header))
    }

    pub fn with_response_header(self, header: HeaderName) -> Self {
        self.with(Field::ResponseHeader(header))
    }

    pub fn with_size(self) -> Self {
        self.with(Field::Size)
    }

    pub fn with_latency(self) -> Self {
        self.with(Field::Latency)
    }

    pub fn with_latency_millis(self) -> Self {
        self.with(Field::LatencyMillis)
    }

    pub fn with_date_time(self) -> Self {
        self.with(Field::RequestTime)
    }

    pub fn with_user_agent(self) -> Self {
        self.with(Field::UserAgent)
    }

    pub fn with_referer(self) -> Self {
        self.with(Field::Referer)
    }

    pub fn with_error(self) -> Self {
        self.with(Field::Error)
    }

    pub fn with_environment(self, var: impl Into<String>) -> Self {
        self.with(Field::Environment(var.into()))
    }
}

impl Default for FieldsBuilder {
    fn default() -> Self {
        FieldsBuilder::new()
            .with_method()
            .with_path()
            .with_status()
            .with_latency()
            .with_error()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    /// Method. Example: GET
    Method,
    /// Status code. Example: 200, 404
    Status,
    /// Request path. Example: /index.html
    Path,
    /// Query string. Example: search=actix
    Params,
    /// Matched route pattern. Example: /users/{id}
    Route,
    /// Version of the HTTP protocol. Example: HTTP/1.1
    Version,
    /// Host. Example: localhost
    Host,
    /// Remote IP address. Example: 192.168.0.1
    RemoteAddr,
    /// Real IP address. Example: 192.168.0.1
    RealIp,
    /// Request ID read from the given request header.
    RequestId(HeaderName),
    #[cfg(feature = "tracing-request-id")]
    /// Tracing request ID. Example: 7b77f3f1-8e15-4b6a-9b3f-7f4b6f4b6f4b.
    TracingRequestId,
    /// Request headers. Example: Accept: application/json
    RequestHeader(HeaderName),
    /// Response headers. Example: Content-Type: application/json
    ResponseHeader(HeaderName),
    /// Size of the response body in bytes, when known up front. Example: 1024
    Size,
    /// Latency of the request in seconds. Example: 0.023
    Latency,
    /// Latency of the request in milliseconds. Example: 23.123
    LatencyMillis,
    /// Request start in RFC3339 format. Example: 2019-05-29T18:51:00.000000Z
    RequestTime,
    /// User agent. Example: Mozilla/5.0
    UserAgent,
    /// Referer. Example: https://actix.rs
    Referer,
    /// Error returned by the handler chain.
    Error,
    /// Environment variable. Example: USER
    Environment(String),
}

impl Field {
    pub fn render(&self, outcome: &RequestOutcome<'_>, logger: &mut Logger) {
        let req = outcome.request;

        match self {
            Field::Method => logger.push("method", Some(outcome.method.to_string())),

            Field::Status => logger.push("status", Some(outcome.status().as_u16().to_string())),

            Field::Path => logger.push("path", Some(outcome.path().to_string())),

            Field::Params => logger.push(
                "params",
                Some(outcome.uri.query().unwrap_or_default().to_string()),
            ),

            Field::Route => logger.push("route", req.and_then(|req| req.match_pattern())),

            Field::Version => {
                let version = match outcome.version {
                    Version::HTTP_09 => "HTTP/0.9",
                    Version::HTTP_10 => "HTTP/1.0",
                    Version::HTTP_11 => "HTTP/1.1",
                    Version::HTTP_2 => "HTTP/2.0",
                    Version::HTTP_3 => "HTTP/3.0",
                    _ => "unknown",
                };
                logger.push("version", Some(version.to_string()));
            }

            Field::Host => logger.push(
                "host",
                req.map(|req| req.connection_info().host().to_string()),
            ),

            Field::RemoteAddr => logger.push(
                "remote_addr",
                req.and_then(|req| req.connection_info().peer_addr().map(|addr| addr.to_string())),
            ),

            Field::RealIp => logger.push(
                "real_ip",
                req.and_then(|req| {
                    req.connection_info()
                        .realip_remote_addr()
                        .map(|addr| addr.to_string())
                }),
            ),

            Field::RequestId(header) | Field::RequestHeader(header) => {
                logger.push(header.to_string(), outcome.request_header(header))
            }

            #[cfg(feature = "tracing-request-id")]
            Field::TracingRequestId => logger.push(
                "tracing_request_id",
                req.and_then(|req| {
                    req.extensions()
                        .get::<tracing_actix_web::RequestId>()
                        .map(|id| id.to_string())
                }),
            ),

            Field::ResponseHeader(header) => logger.push(
                header.to_string(),
                outcome
                    .response
                    .headers()
                    .get(header)
                    .map(|val| val.to_str().unwrap_or_default().to_string()),
            ),

            Field::Size => logger.push(
                "size",
                match outcome.body_size {
                    BodySize::None => Some("0".to_string()),
                    BodySize::Sized(size) => Some(size.to_string()),
                    BodySize::Stream => None,
                },
            ),

            Field::Latency => logger.push(
                "latency",
                Some(outcome.latency.as_seconds_f64().to_string()),
            ),

            Field::LatencyMillis => {
                let ms = (outcome.latency.whole_nanoseconds() as f64) / 1_000_000.0;
                logger.push("latency_ms", Some(ms.to_string()));
            }

            Field::RequestTime => logger.push("datetime", outcome.start.format(&Rfc3339).ok()),

            Field::UserAgent => logger.push("user_agent", outcome.request_header("user-agent")),

            Field::Referer => logger.push("referer", outcome.request_header("referer")),

            Field::Error => logger.push("error", outcome.error.map(|err| err.to_string())),

            Field::Environment(name) => logger.push(name.clone(), env::var(name.as_str()).ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{
        HttpResponse,
        error::ErrorBadGateway,
        http::{Method, header},
        test::TestRequest,
    };

    fn render_one(
        field: Field,
        req: &HttpRequest,
        res: &HttpResponse,
        error: Option<&Error>,
    ) -> Logger {
        let outcome = RequestOutcome {
            request: Some(req),
            method: req.method(),
            uri: req.uri(),
            version: req.version(),
            response: res.head(),
            body_size: BodySize::Sized(1024),
            start: OffsetDateTime::now_utc(),
            latency: Duration::milliseconds(1500),
            error,
            trace_id: ErrorTraceId::new(),
        };
        Fields::new([field]).render(&outcome)
    }

    #[test]
    fn test_fields_builder() {
        // Test default fields
        let fields = Fields::default();

        assert!(fields.contains(&Field::Method));
        assert!(fields.contains(&Field::Status));
        assert!(fields.contains(&Field::Path));
        assert!(fields.contains(&Field::Latency));
        assert!(fields.contains(&Field::Error));
        assert!(!fields.contains(&Field::RemoteAddr));

        // Test custom fields
        let custom_fields = Fields::builder()
            .with_method()
            .with_status()
            .with_method()
            .with_request_header(header::CONTENT_TYPE)
            .with_response_header(HeaderName::from_static("x-request-id"))
            .with_environment("APP_ENV")
            .build();

        assert_eq!(custom_fields.0.len(), 5);
        assert!(custom_fields.contains(&Field::RequestHeader(header::CONTENT_TYPE)));
        assert!(custom_fields.contains(&Field::ResponseHeader(HeaderName::from_static(
            "x-request-id"
        ))));
        assert!(custom_fields.contains(&Field::Environment("APP_ENV".to_string())));
        assert!(!custom_fields.contains(&Field::Path));
    }

    #[test]
    fn test_field_render_request() {
        let req = TestRequest::default()
            .method(Method::POST)
            .uri("/orders?page=2")
            .insert_header(("user-agent", "test-agent"))
            .insert_header(("referer", "https://example.com"))
            .insert_header(("x-request-id", "test-id"))
            .to_http_request();
        let res = HttpResponse::Ok().finish();

        let logger = render_one(Field::Method, &req, &res, None);
        assert_eq!(logger.get("method"), Some(Some("POST")));

        let logger = render_one(Field::Path, &req, &res, None);
        assert_eq!(logger.get("path"), Some(Some("/orders")));

        let logger = render_one(Field::Params, &req, &res, None);
        assert_eq!(logger.get("params"), Some(Some("page=2")));

        let logger = render_one(Field::UserAgent, &req, &res, None);
        assert_eq!(logger.get("user_agent"), Some(Some("test-agent")));

        let logger = render_one(Field::Referer, &req, &res, None);
        assert_eq!(logger.get("referer"), Some(Some("https://example.com")));

        let logger = render_one(
            Field::RequestId(HeaderName::from_static("x-request-id")),
            &req,
            &res,
            None,
        );
        assert_eq!(logger.get("x-request-id"), Some(Some("test-id")));

        let logger = render_one(
            Field::RequestHeader(HeaderName::from_static("x-missing")),
            &req,
            &res,
            None,
        );
        assert_eq!(logger.get("x-missing"), Some(None));

        let logger = render_one(Field::Version, &req, &res, None);
        assert_eq!(logger.get("version"), Some(Some("HTTP/1.1")));
    }

    #[test]
    fn test_field_render_response() {
        let req = TestRequest::default().to_http_request();
        let res = HttpResponse::NotFound()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .finish();

        let logger = render_one(Field::Status, &req, &res, None);
        assert_eq!(logger.get("status"), Some(Some("404")));

        let logger = render_one(Field::ResponseHeader(header::CONTENT_TYPE), &req, &res, None);
        assert_eq!(logger.get("content-type"), Some(Some("application/json")));

        let logger = render_one(
            Field::ResponseHeader(HeaderName::from_static("x-missing-header")),
            &req,
            &res,
            None,
        );
        assert_eq!(logger.get("x-missing-header"), Some(None));

        let logger = render_one(Field::Size, &req, &res, None);
        assert_eq!(logger.get("size"), Some(Some("1024")));
    }

    #[test]
    fn test_field_render_outcome() {
        let req = TestRequest::default().to_http_request();
        let res = HttpResponse::BadGateway().finish();

        let logger = render_one(Field::Latency, &req, &res, None);
        let latency: f64 = logger.get("latency").flatten().unwrap().parse().unwrap();
        assert!((latency - 1.5).abs() < f64::EPSILON);

        let logger = render_one(Field::LatencyMillis, &req, &res, None);
        let latency: f64 = logger.get("latency_ms").flatten().unwrap().parse().unwrap();
        assert!((latency - 1500.0).abs() < f64::EPSILON);

        let logger = render_one(Field::Error, &req, &res, None);
        assert_eq!(logger.get("error"), Some(None));

        let err = ErrorBadGateway("upstream unavailable");
        let logger = render_one(Field::Error, &req, &res, Some(&err));
        assert_eq!(logger.get("error"), Some(Some("upstream unavailable")));

        let logger = render_one(Field::RequestTime, &req, &res, None);
        let datetime = logger.get("datetime").flatten().unwrap();
        assert!(OffsetDateTime::parse(datetime, &Rfc3339).is_ok());
    }

    #[test]
    fn test_field_render_environment() {
        unsafe {
            // Set the environment variable for testing
            std::env::set_var("REQLOG_TEST_ENV_VAR", "test_value");
        }
        let req = TestRequest::default().to_http_request();
        let res = HttpResponse::Ok().finish();

        let logger = render_one(
            Field::Environment("REQLOG_TEST_ENV_VAR".to_string()),
            &req,
            &res,
            None,
        );
        assert_eq!(logger.get("REQLOG_TEST_ENV_VAR"), Some(Some("test_value")));

        let logger = render_one(
            Field::Environment("REQLOG_MISSING_ENV_VAR".to_string()),
            &req,
            &res,
            None,
        );
        assert_eq!(logger.get("REQLOG_MISSING_ENV_VAR"), Some(None));
    }
}
