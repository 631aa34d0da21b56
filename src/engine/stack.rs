//! Ordered layer stack: the routing engine routes are registered into.
//!
//! # Responsibilities
//! - Keep layers in registration order (first match wins)
//! - Walk matching layers for a request, handler by handler
//! - Route failures to the next matching error handler
//! - Answer unmatched requests (404) and unhandled errors (error status)
//!
//! # Design Decisions
//! - The layer list lives in an `ArcSwap`; each request walks the snapshot it
//!   started with, so adding or removing layers never disturbs requests that
//!   are already inside the chain. A handler that suspends a request can
//!   re-anchor it on the live list with `Next::refreshed`
//! - Middleware layers match by segment prefix, route layers match the full
//!   path and the exact method. A `HEAD` request with no `HEAD` route for
//!   its path is served by the `GET` routes instead

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri, Version};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use tower::Service;

use crate::engine::handler::{Handler, HandlerChain, HandlerFuture};
use crate::engine::{LayerId, LayerInfo, LayerKind, RouteRegistry};
use crate::error::RouteError;
use crate::observability::metrics;
use crate::routing::{PathParams, PathPattern};

#[derive(Debug)]
struct Layer {
    id: LayerId,
    kind: LayerKind,
    pattern: PathPattern,
    chain: HandlerChain,
}

impl Layer {
    /// `method` is the method routes are matched against, already adjusted
    /// for the `HEAD` fallback.
    fn matches(&self, method: &Method, path: &str) -> Option<PathParams> {
        match &self.kind {
            LayerKind::Middleware => self.pattern.match_prefix(path),
            LayerKind::Route(m) if m == method => self.pattern.match_exact(path),
            LayerKind::Route(_) => None,
        }
    }

    fn is_route_for(&self, method: &Method, path: &str) -> bool {
        matches!(&self.kind, LayerKind::Route(m) if m == method) && self.pattern.match_exact(path).is_some()
    }

    fn info(&self) -> LayerInfo {
        LayerInfo {
            id: self.id,
            kind: self.kind.clone(),
            path: self.pattern.as_str().to_string(),
            handlers: self.chain.len(),
        }
    }
}

type Snapshot = Arc<Vec<Arc<Layer>>>;

type LiveLayers = Arc<ArcSwap<Vec<Arc<Layer>>>>;

/// The ordered routing engine.
#[derive(Debug, Default)]
pub struct Stack {
    layers: LiveLayers,
    next_id: AtomicU64,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, kind: LayerKind, path: &str, chain: HandlerChain, front: bool) -> LayerId {
        let id = LayerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let layer = Arc::new(Layer {
            id,
            kind,
            pattern: PathPattern::parse(path),
            chain,
        });
        self.layers.rcu(|current| {
            let mut layers = Vec::with_capacity(current.len() + 1);
            if front {
                layers.push(layer.clone());
                layers.extend(current.iter().cloned());
            } else {
                layers.extend(current.iter().cloned());
                layers.push(layer.clone());
            }
            layers
        });
        id
    }

    /// Dispatch a request through the current snapshot of the stack.
    pub async fn handle(&self, req: Request<Body>) -> Response {
        let start = Instant::now();
        let method = req.method().clone();
        let next = Next::start(self.layers.clone(), &req);
        let response = match next.run(req).await {
            Ok(response) => response,
            Err(err) => error_response(&err),
        };
        metrics::record_request(method.as_str(), response.status().as_u16(), start);
        response
    }

    /// A cloneable `tower::Service` over this stack.
    pub fn service(self: &Arc<Self>) -> StackService {
        StackService {
            stack: Arc::clone(self),
        }
    }
}

impl RouteRegistry for Stack {
    fn use_at(&self, path: &str, chain: HandlerChain) -> LayerId {
        self.insert(LayerKind::Middleware, path, chain, false)
    }

    fn route(&self, method: Method, path: &str, chain: HandlerChain) -> LayerId {
        self.insert(LayerKind::Route(method), path, chain, false)
    }

    fn prepend(&self, path: &str, chain: HandlerChain) -> LayerId {
        self.insert(LayerKind::Middleware, path, chain, true)
    }

    fn layers(&self) -> Vec<LayerInfo> {
        self.layers.load().iter().map(|l| l.info()).collect()
    }

    fn remove(&self, id: LayerId) -> bool {
        let mut removed = false;
        self.layers.rcu(|current| {
            removed = current.iter().any(|l| l.id == id);
            current
                .iter()
                .filter(|l| l.id != id)
                .cloned()
                .collect::<Vec<_>>()
        });
        removed
    }
}

/// Request line and headers captured on entry, used to rebuild a request
/// for error handlers once the original was consumed by a failing handler.
#[derive(Debug)]
struct RequestHead {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
}

impl RequestHead {
    fn capture(req: &Request<Body>) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            version: req.version(),
            headers: req.headers().clone(),
        }
    }

    fn rebuild(&self) -> Request<Body> {
        let mut req = Request::new(Body::empty());
        *req.method_mut() = self.method.clone();
        *req.uri_mut() = self.uri.clone();
        *req.version_mut() = self.version;
        *req.headers_mut() = self.headers.clone();
        req
    }
}

/// Continuation handed to every handler: the position right after it.
#[derive(Debug, Clone)]
pub struct Next {
    live: LiveLayers,
    layers: Snapshot,
    head: Arc<RequestHead>,
    layer: usize,
    handler: usize,
}

impl Next {
    fn start(live: LiveLayers, req: &Request<Body>) -> Self {
        Self {
            layers: live.load_full(),
            live,
            head: Arc::new(RequestHead::capture(req)),
            layer: 0,
            handler: 0,
        }
    }

    /// Re-anchor on the current layer list, keeping the position right after
    /// the calling handler. Layers registered since the request entered
    /// become visible.
    ///
    /// If the calling layer has been removed in the meantime, the request
    /// resumes at the first surviving layer that followed it, or right after
    /// the last surviving layer that preceded it.
    pub fn refreshed(mut self) -> Self {
        let current = self.live.load_full();
        let position_of = |layer: &Arc<Layer>| current.iter().position(|l| l.id == layer.id);

        if let Some(position) = self.layers.get(self.layer).and_then(position_of) {
            self.layer = position;
        } else {
            let (before, after) = self.layers.split_at(self.layer.min(self.layers.len()));
            let resume = after
                .iter()
                .skip(1)
                .find_map(position_of)
                .or_else(|| before.iter().rev().find_map(position_of).map(|p| p + 1))
                .unwrap_or(0);
            self.layer = resume;
            self.handler = 0;
        }
        self.layers = current;
        self
    }

    /// `HEAD` falls back to `GET` when no `HEAD` route exists for `path`.
    fn route_method(&self, method: &Method, path: &str) -> Method {
        if *method == Method::HEAD && !self.layers.iter().any(|l| l.is_route_for(&Method::HEAD, path)) {
            Method::GET
        } else {
            method.clone()
        }
    }

    /// Continue with the next matching request handler.
    pub fn run(self, req: Request<Body>) -> HandlerFuture {
        dispatch(self, req, None)
    }

    /// Continue down the error path with `err`.
    pub fn fail(self, err: RouteError, req: Request<Body>) -> HandlerFuture {
        dispatch(self, req, Some(err))
    }

    /// Move past the next handler of the wanted kind and return it.
    fn advance(&mut self, method: &Method, path: &str, errored: bool) -> Option<(Handler, PathParams)> {
        let method = self.route_method(method, path);
        while let Some(layer) = self.layers.get(self.layer).cloned() {
            if let Some(params) = layer.matches(&method, path) {
                while let Some(handler) = layer.chain.get(self.handler) {
                    self.handler += 1;
                    if handler.is_error_handler() == errored {
                        return Some((handler.clone(), params));
                    }
                }
            }
            self.layer += 1;
            self.handler = 0;
        }
        None
    }
}

fn dispatch(mut next: Next, mut req: Request<Body>, mut error: Option<RouteError>) -> BoxFuture<'static, Result<Response, RouteError>> {
    Box::pin(async move {
        loop {
            let method = req.method().clone();
            let path = req.uri().path().to_string();

            let Some((handler, params)) = next.advance(&method, &path, error.is_some()) else {
                return Ok(match error {
                    Some(err) => error_response(&err),
                    None => not_found(&method, &path),
                });
            };
            req.extensions_mut().insert(params);

            let outcome = match (handler, error.take()) {
                (Handler::Request(h), None) => h.call(req, next.clone()).await,
                (Handler::Error(h), Some(err)) => h.call(err, req, next.clone()).await,
                (_, err) => {
                    error = err;
                    continue;
                }
            };

            match outcome {
                Ok(response) => return Ok(response),
                Err(err) => {
                    tracing::debug!(method = %method, path = %path, error = %err, "Handler failed, switching to error path");
                    error = Some(err);
                    req = next.head.rebuild();
                }
            }
        }
    })
}

fn not_found(method: &Method, path: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("Cannot {method} {path}")).into_response()
}

/// Final answer for an error no handler converted.
pub fn error_response(err: &RouteError) -> Response {
    (err.status(), err.to_string()).into_response()
}

/// `tower::Service` adapter so the stack can be mounted in an axum router.
#[derive(Debug, Clone)]
pub struct StackService {
    stack: Arc<Stack>,
}

impl Service<Request<Body>> for StackService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let stack = self.stack.clone();
        Box::pin(async move { Ok(stack.handle(req).await) })
    }
}
