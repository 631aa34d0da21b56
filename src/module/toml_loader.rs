//! Declarative route modules written in TOML.
//!
//! Every top-level key is a named export. A table holding exactly one action
//! key is a handler, any other table is a record of converted values, an
//! array is a sequence, anything else is a plain value.
//!
//! ```toml
//! middleware = [{ header = { name = "x-books", value = "1" } }]
//!
//! [default]
//! respond = { status = 200, body = "Book {bookId}" }
//! ```
//!
//! Actions:
//! - `respond = { status, body, content_type }`: terminal handler; `{param}`
//!   placeholders in `body` are filled from the matched path parameters
//! - `header = { name, value }`: runs the rest of the chain, then sets a
//!   response header
//! - `fail = { status, message }`: fails the request
//! - `catch = { status, body }`: error handler; `{error}` in `body` is replaced
//!   by the error message

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::engine::{error_handler_fn, handler_fn, Handler, Next};
use crate::error::{LoadError, RouteError};
use crate::module::{Export, ModuleLoader, RouteModule};
use crate::routing::PathParams;

/// Loads `.toml` route modules from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlLoader;

impl TomlLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parse module source; `path` is only used for error reporting.
    pub fn parse(path: &Path, source: &str) -> Result<RouteModule, LoadError> {
        let table: toml::Table = toml::from_str(source).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut module = RouteModule::new();
        for (name, value) in table {
            module.insert(name, convert(path, value)?);
        }
        Ok(module)
    }
}

#[async_trait]
impl ModuleLoader for TomlLoader {
    async fn load(&self, base_dir: &Path, relative_path: &str) -> Result<RouteModule, LoadError> {
        let path = base_dir.join(relative_path);
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;
        Self::parse(&path, &source)
    }
}

fn convert(path: &Path, value: toml::Value) -> Result<Export, LoadError> {
    match value {
        toml::Value::Array(items) => Ok(Export::Sequence(
            items
                .into_iter()
                .map(|item| convert(path, item))
                .collect::<Result<_, _>>()?,
        )),
        toml::Value::Table(table) => {
            if let Some((action, spec)) = single_entry(&table) {
                if let Some(handler) = build_action(path, action, spec.clone())? {
                    return Ok(Export::Handler(handler));
                }
            }
            Ok(Export::Record(
                table
                    .into_iter()
                    .map(|(name, value)| convert(path, value).map(|export| (name, export)))
                    .collect::<Result<_, _>>()?,
            ))
        }
        other => plain(path, other),
    }
}

fn single_entry(table: &toml::Table) -> Option<(&String, &toml::Value)> {
    if table.len() == 1 {
        table.iter().next()
    } else {
        None
    }
}

fn plain(path: &Path, value: toml::Value) -> Result<Export, LoadError> {
    serde_json::to_value(value)
        .map(Export::Value)
        .map_err(|e| invalid(path, format!("unrepresentable value: {e}")))
}

fn invalid(path: &Path, message: impl Into<String>) -> LoadError {
    LoadError::Invalid {
        path: PathBuf::from(path),
        message: message.into(),
    }
}

fn status(path: &Path, code: u16) -> Result<StatusCode, LoadError> {
    StatusCode::from_u16(code).map_err(|_| invalid(path, format!("invalid status code {code}")))
}

fn spec<T: for<'de> Deserialize<'de>>(path: &Path, action: &str, value: toml::Value) -> Result<T, LoadError> {
    value
        .try_into()
        .map_err(|e| invalid(path, format!("invalid `{action}` action: {e}")))
}

fn default_ok() -> u16 {
    200
}

fn default_error_status() -> u16 {
    500
}

fn default_catch_body() -> String {
    "{error}".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RespondAction {
    #[serde(default = "default_ok")]
    status: u16,
    #[serde(default)]
    body: String,
    content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HeaderAction {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FailAction {
    #[serde(default = "default_error_status")]
    status: u16,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatchAction {
    #[serde(default = "default_error_status")]
    status: u16,
    #[serde(default = "default_catch_body")]
    body: String,
}

/// `Ok(None)` for keys that are not actions.
fn build_action(path: &Path, action: &str, value: toml::Value) -> Result<Option<Handler>, LoadError> {
    let handler = match action {
        "respond" => {
            let RespondAction { status: code, body, content_type } = spec(path, action, value)?;
            let code = status(path, code)?;
            let content_type = content_type
                .map(|ct| HeaderValue::from_str(&ct))
                .transpose()
                .map_err(|_| invalid(path, "invalid content_type"))?;
            handler_fn(move |req, _next| {
                let body = render(&body, req.extensions().get::<PathParams>());
                let content_type = content_type.clone();
                async move {
                    let mut res = (code, body).into_response();
                    if let Some(ct) = content_type {
                        res.headers_mut().insert(CONTENT_TYPE, ct);
                    }
                    Ok(res)
                }
            })
        }
        "header" => {
            let HeaderAction { name, value } = spec(path, action, value)?;
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| invalid(path, format!("invalid header name `{name}`")))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|_| invalid(path, format!("invalid value for header `{name}`")))?;
            handler_fn(move |req, next: Next| {
                let name = name.clone();
                let value = value.clone();
                async move {
                    let mut res = next.run(req).await?;
                    res.headers_mut().insert(name, value);
                    Ok(res)
                }
            })
        }
        "fail" => {
            let FailAction { status: code, message } = spec(path, action, value)?;
            let code = status(path, code)?;
            handler_fn(move |_req, _next| {
                let err = RouteError::with_status(code, message.clone());
                async move { Err(err) }
            })
        }
        "catch" => {
            let CatchAction { status: code, body } = spec(path, action, value)?;
            let code = status(path, code)?;
            error_handler_fn(move |err, _req, _next| {
                let body = body.replace("{error}", &err.to_string());
                async move { Ok((code, body).into_response()) }
            })
        }
        _ => return Ok(None),
    };
    Ok(Some(handler))
}

fn render(template: &str, params: Option<&PathParams>) -> String {
    let mut out = template.to_string();
    if let Some(params) = params {
        for (name, value) in params.iter() {
            out = out.replace(&format!("{{{name}}}"), value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(source: &str) -> RouteModule {
        TomlLoader::parse(Path::new("test.toml"), source).unwrap()
    }

    #[test]
    fn verb_module_shape() {
        let module = parse(
            r#"
            middleware = [
                { header = { name = "x-a", value = "1" } },
                "this is not a function",
                { header = { name = "x-b", value = "2" } },
            ]

            [default]
            respond = { status = 201, body = "created {id}" }
            "#,
        );
        let names: Vec<&str> = module.exports().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["middleware", "default"]);
        assert_eq!(module.get("middleware").unwrap().handlers().len(), 2);
        assert!(module.get("default").unwrap().is_callable());
    }

    #[test]
    fn non_actions_are_plain_values() {
        let module = parse(
            r#"
            m1 = 1
            m2 = "abc"
            [m3]
            unknown = { x = 1 }
            [m4]
            respond = { status = 200 }
            body = "two keys"
            "#,
        );
        assert!(module.exports().all(|(_, e)| !e.is_callable()));
        assert!(module.exports().all(|(_, e)| e.handlers().is_empty()));
    }

    #[test]
    fn middleware_table_becomes_a_record() {
        let module = parse(
            r#"
            [middleware]
            first = { header = { name = "x-a", value = "1" } }
            label = "not a handler"
            rest = [{ header = { name = "x-b", value = "2" } }, { header = { name = "x-c", value = "3" } }]

            [default]
            respond = { body = "ok" }
            "#,
        );
        let middleware = module.get("middleware").unwrap();
        let Export::Record(members) = middleware else {
            panic!("expected a record, got {middleware:?}");
        };
        let names: Vec<&str> = members.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["first", "label", "rest"]);
        assert!(middleware.handlers().is_empty());
        assert_eq!(middleware.member_handlers().len(), 3);
    }

    #[test]
    fn catch_is_an_error_handler() {
        let module = parse("[handle]\ncatch = { status = 502 }\n");
        let handlers = module.get("handle").unwrap().handlers();
        assert!(handlers[0].is_error_handler());
    }

    #[test]
    fn malformed_actions_fail_the_load() {
        let bad_status = TomlLoader::parse(Path::new("x.toml"), "[default]\nrespond = { status = 1000 }\n");
        assert!(matches!(bad_status, Err(LoadError::Invalid { .. })));

        let bad_field = TomlLoader::parse(Path::new("x.toml"), "[default]\nrespond = { stauts = 200 }\n");
        assert!(matches!(bad_field, Err(LoadError::Invalid { .. })));

        let bad_header = TomlLoader::parse(Path::new("x.toml"), "[m]\nheader = { name = \"bad name\", value = \"v\" }\n");
        assert!(matches!(bad_header, Err(LoadError::Invalid { .. })));

        let bad_syntax = TomlLoader::parse(Path::new("x.toml"), "default = [");
        assert!(matches!(bad_syntax, Err(LoadError::Parse { .. })));
    }

    #[tokio::test]
    async fn actions_behave_through_the_stack() {
        use crate::engine::{HandlerChain, RouteRegistry, Stack};
        use axum::body::Body;
        use axum::http::{Method, Request};
        use std::sync::Arc;
        use tower::ServiceExt;

        let module = parse(
            r#"
            [tag]
            header = { name = "x-tag", value = "books" }
            [default]
            respond = { body = "Book {bookId} of {userId}", content_type = "text/plain" }
            [broken]
            fail = { status = 418, message = "teapot" }
            [recover]
            catch = { status = 503, body = "caught: {error}" }
            "#,
        );
        let chain = |names: &[&str]| -> HandlerChain {
            names
                .iter()
                .flat_map(|n| module.get(n).unwrap().handlers())
                .collect()
        };

        let stack = Arc::new(Stack::new());
        stack.use_at("/", chain(&["tag"]));
        stack.route(Method::GET, "/users/:userId/books/:bookId", chain(&["default"]));
        stack.route(Method::GET, "/broken", chain(&["broken"]));
        stack.use_at("/broken", chain(&["recover"]));

        let req = Request::get("/users/3/books/9").body(Body::empty()).unwrap();
        let res = stack.service().oneshot(req).await.unwrap();
        assert_eq!(res.headers()["x-tag"], "books");
        assert_eq!(res.headers()["content-type"], "text/plain");
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Book 9 of 3");

        let req = Request::get("/broken").body(Body::empty()).unwrap();
        let res = stack.service().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"caught: teapot");
    }

    #[test]
    fn render_without_params_is_verbatim() {
        assert_eq!(render("no {params}", None), "no {params}");
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("books")).unwrap();
        let mut file = std::fs::File::create(dir.path().join("books/get.toml")).unwrap();
        writeln!(file, "[default]\nrespond = {{ body = \"books\" }}").unwrap();

        let module = TomlLoader.load(dir.path(), "books/get.toml").await.unwrap();
        assert!(module.get("default").unwrap().is_callable());

        let missing = TomlLoader.load(dir.path(), "nope/get.toml").await.unwrap_err();
        assert!(matches!(missing, LoadError::Io { .. }));
    }
}
