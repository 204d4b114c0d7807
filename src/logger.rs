use std::{
    future::Future,
    marker::PhantomData,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
    time::Instant,
};

use futures_core::ready;
use pin_project_lite::pin_project;
use time::{Duration, OffsetDateTime};

use actix_service::{Service, Transform};
use actix_utils::future::{Ready, ready};
use actix_http::ResponseHead;
use actix_web::body::{BodySize, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::error::InternalError;
use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue};
use actix_web::http::{Method, Uri, Version};
use actix_web::{Error, HttpMessage, HttpRequest, HttpResponse, Result};

use crate::config::{Config, ConfigError, Options};
use crate::context::{ERROR_TRACE_ID_HEADER, ErrorTraceId, UserContext};
use crate::fields::RequestOutcome;
use crate::level::StatusClass;

/// Middleware logging one record per request, with the severity and message chosen by the
/// status class of the response.
///
/// Every logged request gets a fresh [`ErrorTraceId`], returned to the client in the
/// `errorTraceID` response header and attached to the record as `errorTraceId`.
///
/// # Default Format
/// The [`default`](RequestLogger::default) logs server errors at `error`, client errors at
/// `warn` and everything else at `info`, with the method, path, status, latency and error fields.
///
/// # Examples
/// ```rust
/// use actix_web::App;
/// use actix_web_middleware_reqlog::RequestLogger;
///
/// let app = App::new()
///     .wrap(RequestLogger::default());
/// ```
pub struct RequestLogger(Rc<Config>);

impl RequestLogger {
    /// Create `RequestLogger` middleware from `options`, filling unset options with defaults.
    pub fn new(options: Options) -> Result<RequestLogger, ConfigError> {
        Config::new(options).map(|config| RequestLogger(Rc::new(config)))
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        RequestLogger(Rc::new(Config::default()))
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestLoggerMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddlewareService {
            service,
            config: Rc::clone(&self.0),
        }))
    }
}

/// Logger middleware service.
pub struct RequestLoggerMiddlewareService<S> {
    config: Rc<Config>,
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = RequestLoggerResponse<S, B>;

    actix_service::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.config.is_skipped(&req) {
            return RequestLoggerResponse {
                fut: self.service.call(req),
                pending: None,
                _phantom: PhantomData,
            };
        }

        let start = OffsetDateTime::now_utc();
        let started = Instant::now();
        let trace_id = ErrorTraceId::new();
        req.extensions_mut().insert(trace_id);
        // kept here too, the request is gone when the inner service fails
        let context = UserContext::of(&req);

        // routing needs exclusive access to the HttpRequest, keep a copy of the head parts only
        let pending = Pending {
            config: Rc::clone(&self.config),
            method: req.method().clone(),
            uri: req.uri().clone(),
            version: req.version(),
            start,
            started,
            trace_id,
            context,
        };

        RequestLoggerResponse {
            fut: self.service.call(req),
            pending: Some(pending),
            _phantom: PhantomData,
        }
    }
}

pin_project! {
    pub struct RequestLoggerResponse<S, B>
    where
        B: MessageBody,
        S: Service<ServiceRequest>,
    {
        #[pin]
        fut: S::Future,
        pending: Option<Pending>,
        _phantom: PhantomData<B>,
    }
}

impl<S, B> Future for RequestLoggerResponse<S, B>
where
    B: MessageBody,
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
{
    type Output = Result<ServiceResponse<B>, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let result = ready!(this.fut.poll(cx));

        match this.pending.take() {
            Some(pending) => Poll::Ready(pending.finish(result)),
            // skipped requests pass through untouched
            None => Poll::Ready(result),
        }
    }
}

/// State of a logged request while the inner service runs.
struct Pending {
    config: Rc<Config>,
    method: Method,
    uri: Uri,
    version: Version,
    start: OffsetDateTime,
    started: Instant,
    trace_id: ErrorTraceId,
    context: UserContext,
}

impl Pending {
    fn finish<B: MessageBody>(
        self,
        result: Result<ServiceResponse<B>, Error>,
    ) -> Result<ServiceResponse<B>, Error> {
        match result {
            Ok(mut res) => {
                self.set_trace_header(res.headers_mut());

                let outcome = self.outcome(
                    Some(res.request()),
                    res.response().head(),
                    res.response().body().size(),
                    res.response().error(),
                );
                self.log(&outcome);

                Ok(res)
            }

            // The request was consumed by the failing service, so no ServiceResponse can be
            // built. The translated response travels inside the error and is what the client
            // receives.
            Err(err) => {
                let mut response = self.handle_error(&err);
                self.set_trace_header(response.headers_mut());

                let outcome = self.outcome(
                    None,
                    response.head(),
                    response.body().size(),
                    Some(&err),
                );
                self.log(&outcome);

                Err(InternalError::from_response(err, response).into())
            }
        }
    }

    fn handle_error(&self, err: &Error) -> HttpResponse {
        match (self.config.error_handler)(err) {
            Ok(response) => response,
            Err(_handler_err) => {
                #[cfg(feature = "log")]
                log::debug!(
                    target: "actix_web_middleware_reqlog::error_handler",
                    "Error handler failed: {:?}",
                    _handler_err
                );
                HttpResponse::InternalServerError().finish()
            }
        }
    }

    fn set_trace_header(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.trace_id.to_string()) {
            headers.insert(HeaderName::from_static(ERROR_TRACE_ID_HEADER), value);
        }
    }

    fn outcome<'a>(
        &'a self,
        request: Option<&'a HttpRequest>,
        response: &'a ResponseHead,
        body_size: BodySize,
        error: Option<&'a Error>,
    ) -> RequestOutcome<'a> {
        RequestOutcome {
            request,
            method: &self.method,
            uri: &self.uri,
            version: self.version,
            response,
            body_size,
            start: self.start,
            latency: Duration::try_from(self.started.elapsed()).unwrap_or(Duration::MAX),
            error,
            trace_id: self.trace_id,
        }
    }

    fn log(&self, outcome: &RequestOutcome<'_>) {
        let index = StatusClass::of(outcome.status()).index();

        let severity = self.config.level(index);
        if !severity.is_enabled() {
            return;
        }

        let message = self.config.message(index);
        let logger = (self.config.logger)(outcome);

        // a handler may have replaced the shared context with its own
        let context = outcome
            .request
            .and_then(|req| req.extensions().get::<UserContext>().cloned())
            .unwrap_or_else(|| self.context.clone());
        logger.emit(
            &self.config.log_target,
            severity,
            message,
            Some(&context),
            self.trace_id,
        );
    }
}
