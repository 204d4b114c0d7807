use std::{
    borrow::Cow,
    cell::{Ref, RefCell},
    convert::Infallible,
    fmt,
    rc::Rc,
};

use actix_utils::future::{Ready, ready};
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use uuid::Uuid;

/// Response header carrying the per-request [`ErrorTraceId`].
///
/// HTTP header names are case-insensitive, clients see it as `errorTraceID`.
pub const ERROR_TRACE_ID_HEADER: &str = "errortraceid";

/// Record field carrying the per-request [`ErrorTraceId`].
pub const ERROR_TRACE_ID_FIELD: &str = "errorTraceId";

/// Correlation id generated for every logged request.
///
/// Sent back in the [`ERROR_TRACE_ID_HEADER`] response header and attached to the access log
/// record, so that a client reporting a failure can be matched with the server log. It is also
/// stored in the request extensions:
///
/// ```rust
/// use actix_web::{HttpMessage, HttpRequest, HttpResponse};
/// use actix_web_middleware_reqlog::ErrorTraceId;
///
/// async fn handler(req: HttpRequest) -> HttpResponse {
///     let trace_id = req.extensions().get::<ErrorTraceId>().copied();
///     HttpResponse::Ok().body(format!("{trace_id:?}"))
/// }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ErrorTraceId(Uuid);

impl ErrorTraceId {
    pub(crate) fn new() -> Self {
        #[cfg(not(feature = "uuid_v7"))]
        {
            Self(Uuid::new_v4())
        }
        #[cfg(feature = "uuid_v7")]
        {
            Self(Uuid::now_v7())
        }
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ErrorTraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.as_hyphenated(), f)
    }
}

/// Caller supplied fields attached to the access log record of the current request.
///
/// The middleware stores one in the request extensions of every logged request. Clones share
/// their fields, so fields added by a handler or an inner middleware reach the record even when
/// the inner service fails with an error. Take it as an extractor, or look it up with
/// [`UserContext::of`]:
///
/// ```rust
/// use actix_web::HttpResponse;
/// use actix_web_middleware_reqlog::UserContext;
///
/// async fn handler(ctx: UserContext) -> HttpResponse {
///     ctx.insert("user_id", 42);
///     HttpResponse::Ok().finish()
/// }
/// ```
///
/// A context inserted with `extensions_mut().insert(..)` replaces the shared one, and its fields
/// are only logged when the request reaches the middleware again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserContext(Rc<RefCell<Vec<(Cow<'static, str>, String)>>>);

impl UserContext {
    pub fn new() -> Self {
        UserContext::default()
    }

    /// Returns the context stored in the extensions of `msg`, storing a new one if there is none.
    pub fn of(msg: &impl HttpMessage) -> Self {
        let current = msg.extensions().get::<UserContext>().cloned();
        match current {
            Some(ctx) => ctx,
            None => {
                let ctx = UserContext::new();
                msg.extensions_mut().insert(ctx.clone());
                ctx
            }
        }
    }

    pub fn with(self, key: impl Into<Cow<'static, str>>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a field, replacing the value of an existing field with the same key.
    pub fn insert(&self, key: impl Into<Cow<'static, str>>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        let mut fields = self.0.borrow_mut();
        match fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.0
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub(crate) fn fields(&self) -> Ref<'_, Vec<(Cow<'static, str>, String)>> {
        self.0.borrow()
    }
}

impl FromRequest for UserContext {
    type Error = Infallible;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(UserContext::of(req)))
    }
}
