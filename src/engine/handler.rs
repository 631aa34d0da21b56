//! Request handlers and handler chains.
//!
//! A handler either produces a response, continues the chain with
//! [`Next::run`], or fails. Failures returned as `Err` are picked up by the
//! engine and delivered to the next matching error handler.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::engine::stack::Next;
use crate::error::RouteError;

pub type HandlerResult = Result<Response, RouteError>;
pub type HandlerFuture = BoxFuture<'static, HandlerResult>;

/// A normal request handler.
pub trait RequestHandler: Send + Sync + 'static {
    fn call(&self, req: Request<Body>, next: Next) -> HandlerFuture;
}

/// An error handler; only invoked while an error is propagating.
pub trait ErrorHandler: Send + Sync + 'static {
    fn call(&self, err: RouteError, req: Request<Body>, next: Next) -> HandlerFuture;
}

/// A callable in a handler chain.
#[derive(Clone)]
pub enum Handler {
    Request(Arc<dyn RequestHandler>),
    Error(Arc<dyn ErrorHandler>),
}

impl Handler {
    pub fn is_error_handler(&self) -> bool {
        matches!(self, Handler::Error(_))
    }

    /// Identity comparison (same underlying callable).
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        match (self, other) {
            (Handler::Request(a), Handler::Request(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            (Handler::Error(a), Handler::Error(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }

    /// Wrap the handler so that a panic, raised while building its future or
    /// while polling it, is forwarded down the error path instead of tearing
    /// down the connection. Error handlers keep their own propagation path.
    pub fn forward_failures(self) -> Handler {
        match self {
            Handler::Request(inner) => Handler::Request(Arc::new(ForwardRequest(inner))),
            Handler::Error(inner) => Handler::Error(Arc::new(ForwardError(inner))),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Request(_) => f.write_str("Handler::Request"),
            Handler::Error(_) => f.write_str("Handler::Error"),
        }
    }
}

struct ForwardRequest(Arc<dyn RequestHandler>);

impl RequestHandler for ForwardRequest {
    fn call(&self, req: Request<Body>, next: Next) -> HandlerFuture {
        let started = panic::catch_unwind(AssertUnwindSafe(|| self.0.call(req, next)));
        guard_future(started)
    }
}

struct ForwardError(Arc<dyn ErrorHandler>);

impl ErrorHandler for ForwardError {
    fn call(&self, err: RouteError, req: Request<Body>, next: Next) -> HandlerFuture {
        let started = panic::catch_unwind(AssertUnwindSafe(|| self.0.call(err, req, next)));
        guard_future(started)
    }
}

fn guard_future(started: Result<HandlerFuture, Box<dyn Any + Send>>) -> HandlerFuture {
    let fut = match started {
        Ok(fut) => fut,
        Err(payload) => {
            let err = panicked(payload);
            return Box::pin(async move { Err(err) });
        }
    };
    Box::pin(async move {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(panicked(payload)),
        }
    })
}

fn panicked(payload: Box<dyn Any + Send>) -> RouteError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %message, "Route handler panicked");
    RouteError::Panicked(message)
}

struct FnHandler<F>(F);

impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: Request<Body>, next: Next) -> HandlerFuture {
        Box::pin((self.0)(req, next))
    }
}

struct FnErrorHandler<F>(F);

impl<F, Fut> ErrorHandler for FnErrorHandler<F>
where
    F: Fn(RouteError, Request<Body>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, err: RouteError, req: Request<Body>, next: Next) -> HandlerFuture {
        Box::pin((self.0)(err, req, next))
    }
}

/// Build a request handler from an async closure.
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Handler::Request(Arc::new(FnHandler(f)))
}

/// Build an error handler from an async closure.
pub fn error_handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(RouteError, Request<Body>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Handler::Error(Arc::new(FnErrorHandler(f)))
}

/// Ordered handlers bound to one layer.
#[derive(Debug, Clone, Default)]
pub struct HandlerChain(Vec<Handler>);

impl HandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handler: Handler) {
        self.0.push(handler);
    }

    pub fn get(&self, index: usize) -> Option<&Handler> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Handler> {
        self.0.iter()
    }
}

impl From<Vec<Handler>> for HandlerChain {
    fn from(handlers: Vec<Handler>) -> Self {
        Self(handlers)
    }
}

impl FromIterator<Handler> for HandlerChain {
    fn from_iter<I: IntoIterator<Item = Handler>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Handler> for HandlerChain {
    fn extend<I: IntoIterator<Item = Handler>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}
