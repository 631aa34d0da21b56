//! The fixed set of route-file method tokens.

use std::fmt;

use axum::http::Method;

/// A route-file method token.
///
/// Declaration order is the canonical priority order used to break ties
/// between entries that share one exact route path; `Middleware` ranks first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RouteMethod {
    /// Pseudo-method: applies to every verb under a path prefix.
    Middleware,
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl RouteMethod {
    /// Every method token in canonical priority order.
    pub const ALL: [RouteMethod; 9] = [
        RouteMethod::Middleware,
        RouteMethod::Get,
        RouteMethod::Post,
        RouteMethod::Put,
        RouteMethod::Patch,
        RouteMethod::Delete,
        RouteMethod::Head,
        RouteMethod::Options,
        RouteMethod::Trace,
    ];

    /// Parse a file-stem token. Tokens are case-sensitive and lowercase.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == token)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::Middleware => "middleware",
            RouteMethod::Get => "get",
            RouteMethod::Post => "post",
            RouteMethod::Put => "put",
            RouteMethod::Patch => "patch",
            RouteMethod::Delete => "delete",
            RouteMethod::Head => "head",
            RouteMethod::Options => "options",
            RouteMethod::Trace => "trace",
        }
    }

    pub fn is_middleware(&self) -> bool {
        matches!(self, RouteMethod::Middleware)
    }

    /// The HTTP verb for verb entries, `None` for the middleware pseudo-method.
    pub fn http_method(&self) -> Option<Method> {
        match self {
            RouteMethod::Middleware => None,
            RouteMethod::Get => Some(Method::GET),
            RouteMethod::Post => Some(Method::POST),
            RouteMethod::Put => Some(Method::PUT),
            RouteMethod::Patch => Some(Method::PATCH),
            RouteMethod::Delete => Some(Method::DELETE),
            RouteMethod::Head => Some(Method::HEAD),
            RouteMethod::Options => Some(Method::OPTIONS),
            RouteMethod::Trace => Some(Method::TRACE),
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip() {
        for method in RouteMethod::ALL {
            assert_eq!(RouteMethod::from_token(method.as_str()), Some(method));
        }
        assert_eq!(RouteMethod::from_token("GET"), None);
        assert_eq!(RouteMethod::from_token("invalid"), None);
        assert_eq!(RouteMethod::from_token(""), None);
    }

    #[test]
    fn middleware_ranks_first() {
        assert_eq!(RouteMethod::ALL[0], RouteMethod::Middleware);
        assert!(RouteMethod::ALL.windows(2).all(|w| w[0] < w[1]));
        assert!(RouteMethod::Middleware.http_method().is_none());
        assert_eq!(RouteMethod::Trace.http_method(), Some(Method::TRACE));
    }
}
