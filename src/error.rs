//! Error types shared across the route table builder and the serving chain.
//!
//! # Taxonomy
//! - Classification and binding skips are not errors (filtered, never surface)
//! - `DiscoveryError` / `LoadError`: fatal to the build, reported once as `BuildError`
//! - `RouteError`: failures travelling through the serving chain at request time

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;

/// Failure to enumerate candidate route files.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("route directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("invalid file pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to walk route directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("route enumeration task failed: {0}")]
    Task(String),
}

/// Failure to load a single route module.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no route module registered for `{0}`")]
    NotFound(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid route module {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

/// Terminal reason carried by a failed initialization signal.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("route initialization was abandoned before completing")]
    Abandoned,
}

/// Errors forwarded along the serving chain.
#[derive(Debug, Clone, Error)]
pub enum RouteError {
    /// The route table could not be built; every gated request observes this.
    #[error("route initialization failed: {0}")]
    InitializationFailed(Arc<BuildError>),

    /// A handler reported a failure.
    #[error("{message}")]
    Handler { status: StatusCode, message: String },

    /// A handler panicked while producing its response.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl RouteError {
    /// A handler failure answered with `500 Internal Server Error`.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Handler {
            status,
            message: message.into(),
        }
    }

    /// Status code used when no error handler converts this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::InitializationFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            RouteError::Handler { status, .. } => *status,
            RouteError::Panicked(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let failed = RouteError::InitializationFailed(Arc::new(BuildError::Abandoned));
        assert_eq!(failed.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(RouteError::handler("boom").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            RouteError::with_status(StatusCode::FORBIDDEN, "nope").status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(RouteError::Panicked("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn build_error_is_transparent() {
        let err = BuildError::from(LoadError::NotFound("users/get.toml".into()));
        assert_eq!(err.to_string(), "no route module registered for `users/get.toml`");
    }
}
