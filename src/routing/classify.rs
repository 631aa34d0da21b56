//! Path classification: relative file path → route entry.
//!
//! # Rules
//! - The file stem must be a known method token, otherwise the path is not a route
//! - Directories become route segments; a leading `_` turns a segment into `:param`
//! - Files directly under the route directory map to `/`

use crate::routing::method::RouteMethod;
use crate::routing::table::RouteEntry;

/// Marker that turns a directory name into a named path parameter.
pub const PARAM_MARKER: char = '_';

/// Classify a relative route-file path. Never fails; non-routes yield `None`.
pub fn classify(relative_path: &str) -> Option<RouteEntry> {
    let (dir, file_name) = match relative_path.rfind('/') {
        Some(idx) => (Some(&relative_path[..idx]), &relative_path[idx + 1..]),
        None => (None, relative_path),
    };

    // The token is everything before the last dot; no extension means no route.
    let stem = &file_name[..file_name.rfind('.')?];
    let method = RouteMethod::from_token(stem)?;

    let route_path = match dir {
        Some(dir) => {
            let mut route_path = String::with_capacity(dir.len() + 1);
            for segment in dir.split('/') {
                route_path.push('/');
                match segment.strip_prefix(PARAM_MARKER) {
                    Some(name) => {
                        route_path.push(':');
                        route_path.push_str(name);
                    }
                    None => route_path.push_str(segment),
                }
            }
            route_path
        }
        None => "/".to_string(),
    };

    Some(RouteEntry {
        method,
        route_path,
        source_path: relative_path.to_string(),
    })
}
