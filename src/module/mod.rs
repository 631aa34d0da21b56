//! Route modules: what a route file exports.
//!
//! # Data Flow
//! ```text
//! OrderedRouteTable
//!     → resolver.rs (one load per entry, strictly sequential)
//!         → ModuleLoader (static_loader.rs | toml_loader.rs)
//!     → binder.rs (exports → handler chain → RouteRegistry)
//! ```
//!
//! # Design Decisions
//! - A module is an ordered list of named exports; declaration order is kept
//! - Export shapes are handled by one capability check (`Export::handlers`),
//!   used identically for middleware files and verb files
//! - A verb file's `middleware` export may also be a keyed record; its values
//!   are flattened in declaration order (`Export::member_handlers`)

use serde_json::Value;

use crate::engine::Handler;

pub mod binder;
pub mod resolver;
pub mod static_loader;
pub mod toml_loader;

pub use binder::{apply_route_table, bind_handlers};
pub use resolver::{resolve_modules, ModuleLoader};
pub use static_loader::StaticLoader;
pub use toml_loader::TomlLoader;

/// Name of the terminal handler export of a verb module.
pub const DEFAULT_EXPORT: &str = "default";
/// Name of the supplementary middleware export of a verb module.
pub const MIDDLEWARE_EXPORT: &str = "middleware";

/// One exported value.
#[derive(Debug, Clone)]
pub enum Export {
    /// Something invocable.
    Handler(Handler),
    /// An ordered sequence of exports.
    Sequence(Vec<Export>),
    /// Named exports in declaration order.
    Record(Vec<(String, Export)>),
    /// Anything else; never invoked.
    Value(Value),
}

impl Export {
    pub fn is_callable(&self) -> bool {
        matches!(self, Export::Handler(_))
    }

    /// The invocables this export contributes: itself if callable, the
    /// callable elements if a sequence (one level deep), nothing otherwise.
    pub fn handlers(&self) -> Vec<Handler> {
        match self {
            Export::Handler(h) => vec![h.clone()],
            Export::Sequence(items) => items
                .iter()
                .filter_map(|item| match item {
                    Export::Handler(h) => Some(h.clone()),
                    _ => None,
                })
                .collect(),
            Export::Record(_) | Export::Value(_) => Vec::new(),
        }
    }

    /// Like [`Export::handlers`], except that a record contributes the
    /// handlers of each of its values, in declaration order.
    pub fn member_handlers(&self) -> Vec<Handler> {
        match self {
            Export::Record(members) => members.iter().flat_map(|(_, member)| member.handlers()).collect(),
            other => other.handlers(),
        }
    }
}

impl From<Handler> for Export {
    fn from(handler: Handler) -> Self {
        Export::Handler(handler)
    }
}

impl From<Vec<Handler>> for Export {
    fn from(handlers: Vec<Handler>) -> Self {
        Export::Sequence(handlers.into_iter().map(Export::Handler).collect())
    }
}

impl From<Value> for Export {
    fn from(value: Value) -> Self {
        Export::Value(value)
    }
}

/// A loaded route module.
#[derive(Debug, Clone, Default)]
pub struct RouteModule {
    exports: Vec<(String, Export)>,
}

impl RouteModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a named export; a replaced export keeps its position.
    pub fn with_export(mut self, name: impl Into<String>, export: impl Into<Export>) -> Self {
        self.insert(name, export);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, export: impl Into<Export>) {
        let name = name.into();
        let export = export.into();
        match self.exports.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = export,
            None => self.exports.push((name, export)),
        }
    }

    /// Shorthand for the `default` export.
    pub fn with_default(self, handler: Handler) -> Self {
        self.with_export(DEFAULT_EXPORT, handler)
    }

    pub fn get(&self, name: &str) -> Option<&Export> {
        self.exports.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    /// Exports in declaration order.
    pub fn exports(&self) -> impl Iterator<Item = (&str, &Export)> {
        self.exports.iter().map(|(n, e)| (n.as_str(), e))
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{error_handler_fn, handler_fn};
    use axum::response::IntoResponse;
    use serde_json::json;

    fn noop() -> Handler {
        handler_fn(|_req, _next| async { Ok("ok".into_response()) })
    }

    #[test]
    fn handlers_flatten_one_level() {
        let a = noop();
        let b = noop();
        let nested = Export::Sequence(vec![Export::Handler(noop())]);
        let export = Export::Sequence(vec![
            Export::Handler(a.clone()),
            Export::Value(json!("this is not a function")),
            nested,
            Export::Handler(b.clone()),
        ]);
        let handlers = export.handlers();
        assert_eq!(handlers.len(), 2);
        assert!(handlers[0].ptr_eq(&a));
        assert!(handlers[1].ptr_eq(&b));
    }

    #[test]
    fn values_are_not_callable() {
        assert!(Export::Value(json!(1)).handlers().is_empty());
        assert!(!Export::Value(json!({"a": 1})).is_callable());
        assert!(Export::from(noop()).is_callable());
        assert_eq!(Export::from(error_handler_fn(|e, _r, _n| async move { Err(e) })).handlers().len(), 1);
    }

    #[test]
    fn exports_keep_declaration_order() {
        let module = RouteModule::new()
            .with_export("m2", json!("x"))
            .with_export("m1", noop())
            .with_export("m2", noop());
        let names: Vec<&str> = module.exports().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["m2", "m1"]);
        assert!(module.get("m2").unwrap().is_callable());
        assert!(module.get("missing").is_none());
    }
}
