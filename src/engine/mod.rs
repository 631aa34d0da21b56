//! Serving-chain engine.
//!
//! # Data Flow
//! ```text
//! Request
//!     → stack.rs (snapshot of layers, first match wins)
//!     → handler.rs (chain of request handlers, `Next` continues)
//!     → on failure: next matching error handler, else error response
//!     → no match: 404
//! ```
//!
//! # Design Decisions
//! - Registration goes through the `RouteRegistry` trait so the builder,
//!   the binder and the gate never depend on the stack's internals
//! - Every registration returns a `LayerId`; removal is by that handle

use std::fmt;

use axum::http::Method;

pub mod handler;
pub mod stack;

pub use handler::{
    error_handler_fn, handler_fn, ErrorHandler, Handler, HandlerChain, HandlerFuture,
    HandlerResult, RequestHandler,
};
pub use stack::{error_response, Next, Stack, StackService};

/// Identity of a registered layer, returned at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub(crate) u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer-{}", self.0)
    }
}

/// What a layer matches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerKind {
    /// Every method, path matched by segment prefix.
    Middleware,
    /// One method, full path match.
    Route(Method),
}

/// Inspectable view of one registered layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub id: LayerId,
    pub kind: LayerKind,
    pub path: String,
    pub handlers: usize,
}

/// Registration surface of an ordered routing engine.
pub trait RouteRegistry: Send + Sync {
    /// Append a middleware layer for `path` and everything below it.
    fn use_at(&self, path: &str, chain: HandlerChain) -> LayerId;

    /// Append a route layer for one method and exact path.
    fn route(&self, method: Method, path: &str, chain: HandlerChain) -> LayerId;

    /// Insert a middleware layer in front of every existing layer.
    fn prepend(&self, path: &str, chain: HandlerChain) -> LayerId;

    /// Registered layers in match order.
    fn layers(&self) -> Vec<LayerInfo>;

    /// Remove a layer. Returns false if it was not registered.
    fn remove(&self, id: LayerId) -> bool;
}
