//! Resolution of route options from configuration.

use std::path::Path;

use crate::builder::RouterOptions;
use crate::config::schema::RoutesConfig;
use crate::discovery::absolutize;

/// Route directory used when none is configured.
pub const DEFAULT_ROUTE_DIR: &str = "routes";

/// File extension used when none is configured.
pub const DEFAULT_EXTENSION: &str = "toml";

/// Turn the routes section into concrete router options.
///
/// `absolute_path` wins over `route_dir`; a relative directory is resolved
/// against `cwd`. Missing values fall back to the defaults above.
pub fn resolve_router_options(routes: &RoutesConfig, cwd: &Path) -> RouterOptions {
    let route_dir = match &routes.absolute_path {
        Some(dir) => Path::new(dir).to_path_buf(),
        None => absolutize(
            Path::new(routes.route_dir.as_deref().unwrap_or(DEFAULT_ROUTE_DIR)),
            cwd,
        ),
    };

    let extensions = match &routes.extensions {
        Some(exts) if !exts.is_empty() => exts.clone(),
        _ => vec![DEFAULT_EXTENSION.to_string()],
    };

    RouterOptions {
        route_dir,
        extensions,
        debug: routes.debug,
    }
}
