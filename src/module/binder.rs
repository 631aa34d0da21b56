//! Turns loaded route modules into handler chains and registers them.
//!
//! # Responsibilities
//! - Normalize exports into handler lists
//! - Build one chain per table entry (middleware file or verb file)
//! - Adapt every handler so failures reach the engine's error path
//! - Register chains into a `RouteRegistry` in table order

use crate::engine::{Handler, HandlerChain, RouteRegistry};
use crate::module::{Export, RouteModule, DEFAULT_EXPORT, MIDDLEWARE_EXPORT};
use crate::observability::metrics;
use crate::routing::{OrderedRouteTable, RouteEntry};

/// The handlers an export contributes. See [`Export::handlers`].
pub fn normalize(export: &Export) -> Vec<Handler> {
    export.handlers()
}

/// Build the handler chain for one entry.
///
/// Middleware files contribute every callable export, in declaration order.
/// Verb files need a callable `default` export; their optional `middleware`
/// export (a handler, a sequence, or a record of either) runs first. An empty
/// chain means nothing should be registered.
pub fn bind_handlers(entry: &RouteEntry, module: &RouteModule) -> HandlerChain {
    let handlers: Vec<Handler> = if entry.method.is_middleware() {
        module.exports().flat_map(|(_, export)| normalize(export)).collect()
    } else {
        match module.get(DEFAULT_EXPORT) {
            Some(Export::Handler(terminal)) => {
                let mut handlers = module
                    .get(MIDDLEWARE_EXPORT)
                    .map(Export::member_handlers)
                    .unwrap_or_default();
                handlers.push(terminal.clone());
                handlers
            }
            _ => Vec::new(),
        }
    };

    handlers.into_iter().map(Handler::forward_failures).collect()
}

/// Register every entry of `table` with the module loaded for it.
///
/// `modules` must be index-aligned with `table`, as returned by
/// [`resolve_modules`](crate::module::resolve_modules); on a length mismatch
/// nothing is registered. Returns the number of registered layers; entries
/// without a handling function are skipped.
pub fn apply_route_table(
    registry: &dyn RouteRegistry,
    table: &OrderedRouteTable,
    modules: &[RouteModule],
    debug: bool,
) -> usize {
    if table.len() != modules.len() {
        tracing::error!(
            entries = table.len(),
            modules = modules.len(),
            "Route modules are not aligned with the route table, nothing registered"
        );
        return 0;
    }

    let mut registered = 0;
    for (entry, module) in table.iter().zip(modules) {
        let chain = bind_handlers(entry, module);
        if chain.is_empty() {
            log_entry(debug, entry, "no handling function");
            continue;
        }

        let handlers = chain.len();
        match entry.method.http_method() {
            Some(method) => registry.route(method, &entry.route_path, chain),
            None => registry.use_at(&entry.route_path, chain),
        };
        registered += 1;
        log_entry(debug, entry, "registered");
        tracing::trace!(path = %entry.route_path, handlers, "Layer registered");
    }

    metrics::record_routes_registered(registered);
    if debug {
        tracing::info!(entries = table.len(), registered, "Routes initialized");
    } else {
        tracing::debug!(entries = table.len(), registered, "Routes initialized");
    }
    registered
}

fn log_entry(debug: bool, entry: &RouteEntry, outcome: &str) {
    let action = match entry.method.http_method() {
        Some(method) => format!("Applying route {method} {}", entry.route_path),
        None => format!("Applying middleware for route {}", entry.route_path),
    };
    if debug {
        tracing::info!(source = %entry.source_path, outcome, "{action}");
    } else {
        tracing::debug!(source = %entry.source_path, outcome, "{action}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{error_handler_fn, handler_fn, LayerId, LayerInfo, Next, Stack};
    use crate::error::RouteError;
    use axum::body::Body;
    use axum::http::{HeaderValue, Method, Request, StatusCode};
    use axum::response::IntoResponse;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn respond(body: &'static str) -> Handler {
        handler_fn(move |_req, _next| async move { Ok(body.into_response()) })
    }

    fn tag(name: &'static str) -> Handler {
        handler_fn(move |req, next: Next| async move {
            let mut res = next.run(req).await?;
            res.headers_mut().append("x-trail", HeaderValue::from_static(name));
            Ok(res)
        })
    }

    fn entry(path: &str) -> RouteEntry {
        crate::routing::classify(path).unwrap()
    }

    /// Registry that only records calls.
    #[derive(Default)]
    struct RecordingRegistry {
        calls: Mutex<Vec<(Option<Method>, String, usize)>>,
    }

    impl RouteRegistry for RecordingRegistry {
        fn use_at(&self, path: &str, chain: HandlerChain) -> LayerId {
            let mut calls = self.calls.lock();
            calls.push((None, path.to_string(), chain.len()));
            LayerId(calls.len() as u64)
        }

        fn route(&self, method: Method, path: &str, chain: HandlerChain) -> LayerId {
            let mut calls = self.calls.lock();
            calls.push((Some(method), path.to_string(), chain.len()));
            LayerId(calls.len() as u64)
        }

        fn prepend(&self, path: &str, chain: HandlerChain) -> LayerId {
            self.use_at(path, chain)
        }

        fn layers(&self) -> Vec<LayerInfo> {
            Vec::new()
        }

        fn remove(&self, _id: LayerId) -> bool {
            false
        }
    }

    #[test]
    fn middleware_module_concatenates_exports() {
        let module = RouteModule::new()
            .with_export("m1", respond("a"))
            .with_export("m2", Export::Sequence(vec![respond("b").into(), json!("x").into(), respond("c").into()]))
            .with_export("m3", json!(3));
        assert_eq!(bind_handlers(&entry("books/middleware.toml"), &module).len(), 3);
    }

    #[test]
    fn verb_module_needs_callable_default() {
        let without_default = RouteModule::new().with_export("middleware", respond("m"));
        assert!(bind_handlers(&entry("books/get.toml"), &without_default).is_empty());

        let value_default = RouteModule::new().with_export("default", json!("not a function"));
        assert!(bind_handlers(&entry("books/get.toml"), &value_default).is_empty());

        let sequence_default = RouteModule::new().with_export("default", vec![respond("a")]);
        assert!(bind_handlers(&entry("books/get.toml"), &sequence_default).is_empty());

        let full = RouteModule::new()
            .with_default(respond("leaf"))
            .with_export("middleware", vec![tag("a"), tag("b")])
            .with_export("unrelated", tag("ignored"));
        assert_eq!(bind_handlers(&entry("books/get.toml"), &full).len(), 3);
    }

    #[tokio::test]
    async fn verb_middleware_record_is_flattened_in_order() {
        let module = RouteModule::new().with_default(respond("leaf")).with_export(
            "middleware",
            Export::Record(vec![
                ("first".to_string(), tag("a").into()),
                ("note".to_string(), json!("skip me").into()),
                ("rest".to_string(), vec![tag("b"), tag("c")].into()),
            ]),
        );
        let chain = bind_handlers(&entry("books/get.toml"), &module);
        assert_eq!(chain.len(), 4);

        // Middleware files do not look inside records.
        let record_only = RouteModule::new().with_export("mw", Export::Record(vec![("a".to_string(), tag("a").into())]));
        assert!(bind_handlers(&entry("books/middleware.toml"), &record_only).is_empty());

        let stack = Arc::new(Stack::new());
        stack.route(Method::GET, "/books", chain);
        let req = Request::get("/books").body(Body::empty()).unwrap();
        let res = stack.service().oneshot(req).await.unwrap();
        let trail: Vec<&str> = res.headers().get_all("x-trail").iter().map(|v| v.to_str().unwrap()).collect();
        // Tags are appended on the way out, innermost first.
        assert_eq!(trail, vec!["c", "b", "a"]);
    }

    #[test]
    fn registers_in_table_order_and_skips_empty_chains() {
        let table = OrderedRouteTable::from_paths(["get.toml", "books/middleware.toml", "books/post.toml", "middleware.toml"]);
        let modules: Vec<RouteModule> = table
            .iter()
            .map(|e| match e.source_path.as_str() {
                "books/post.toml" => RouteModule::new().with_export("other", respond("x")),
                "middleware.toml" => RouteModule::new().with_export("mw", tag("root")),
                _ => RouteModule::new().with_default(respond("x")),
            })
            .collect();

        let registry = RecordingRegistry::default();
        let count = apply_route_table(&registry, &table, &modules, true);
        assert_eq!(count, 3);
        assert_eq!(
            *registry.calls.lock(),
            vec![
                (None, "/".to_string(), 1),
                (None, "/books".to_string(), 1),
                (Some(Method::GET), "/".to_string(), 1),
            ]
        );
    }

    #[test]
    fn middleware_module_without_callables_is_skipped() {
        let inert = RouteModule::new()
            .with_export("a", json!(1))
            .with_export("b", Export::Sequence(vec![json!("s").into(), Export::Sequence(vec![respond("nested").into()])]));
        assert!(bind_handlers(&entry("x/middleware.toml"), &inert).is_empty());

        let table = OrderedRouteTable::from_paths(["x/middleware.toml", "x/get.toml"]);
        let modules: Vec<RouteModule> = table
            .iter()
            .map(|e| {
                if e.method.is_middleware() {
                    inert.clone()
                } else {
                    RouteModule::new().with_default(respond("x"))
                }
            })
            .collect();

        let registry = RecordingRegistry::default();
        assert_eq!(apply_route_table(&registry, &table, &modules, false), 1);
        assert_eq!(*registry.calls.lock(), vec![(Some(Method::GET), "/x".to_string(), 1)]);
    }

    #[test]
    fn misaligned_modules_register_nothing() {
        let table = OrderedRouteTable::from_paths(["get.toml", "books/get.toml"]);
        let modules = vec![RouteModule::new().with_default(respond("only one"))];

        let registry = RecordingRegistry::default();
        assert_eq!(apply_route_table(&registry, &table, &modules, false), 0);
        assert!(registry.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn bound_chains_run_middleware_before_default() {
        let table = OrderedRouteTable::from_paths(["books/get.toml", "books/middleware.toml"]);
        let modules: Vec<RouteModule> = table
            .iter()
            .map(|e| {
                if e.method.is_middleware() {
                    RouteModule::new().with_export("a", tag("dir"))
                } else {
                    RouteModule::new()
                        .with_default(respond("books"))
                        .with_export("middleware", vec![tag("own")])
                }
            })
            .collect();

        let stack = Arc::new(Stack::new());
        apply_route_table(stack.as_ref(), &table, &modules, false);

        let req = Request::get("/books").body(Body::empty()).unwrap();
        let res = stack.service().oneshot(req).await.unwrap();
        let trail: Vec<&str> = res.headers().get_all("x-trail").iter().map(|v| v.to_str().unwrap()).collect();
        assert_eq!(trail, vec!["own", "dir"]);
    }

    #[tokio::test]
    async fn panics_and_errors_reach_error_handlers() {
        let table = OrderedRouteTable::from_paths(["middleware.toml", "panic/get.toml", "fail/get.toml"]);
        let modules: Vec<RouteModule> = table
            .iter()
            .map(|e| match e.source_path.as_str() {
                "middleware.toml" => RouteModule::new().with_export(
                    "catch",
                    error_handler_fn(|err, _req, _next| async move {
                        Ok((StatusCode::BAD_GATEWAY, format!("caught: {err}")).into_response())
                    }),
                ),
                "panic/get.toml" => RouteModule::new().with_default(handler_fn(|_req, _next| async move {
                    if true {
                        panic!("exploded");
                    }
                    Ok("unreachable".into_response())
                })),
                _ => RouteModule::new().with_default(handler_fn(|_req, _next| async move {
                    Err(RouteError::handler("refused"))
                })),
            })
            .collect();

        let stack = Arc::new(Stack::new());
        apply_route_table(stack.as_ref(), &table, &modules, false);
        // Catch-all error handling after the routes.
        stack.use_at("/", HandlerChain::from(vec![modules[0].get("catch").unwrap().handlers()[0].clone()]));

        for (uri, expected) in [("/panic", "caught: handler panicked: exploded"), ("/fail", "caught: refused")] {
            let req = Request::get(uri).body(Body::empty()).unwrap();
            let res = stack.service().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
            let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&body[..], expected.as_bytes());
        }
    }
}
