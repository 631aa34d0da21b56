//! In-memory module registry.
//!
//! Used when route modules are compiled into the binary instead of read from
//! disk. Both plain and future-returning factories are accepted; the resolver
//! cannot tell them apart.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::error::LoadError;
use crate::module::{ModuleLoader, RouteModule};

type ModuleFactory = Arc<dyn Fn() -> BoxFuture<'static, Result<RouteModule, LoadError>> + Send + Sync>;

/// Loader backed by a map of relative path → module factory.
#[derive(Clone, Default)]
pub struct StaticLoader {
    modules: HashMap<String, ModuleFactory>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ready-made module; every load hands out a clone.
    pub fn register(mut self, relative_path: impl Into<String>, module: RouteModule) -> Self {
        let factory: ModuleFactory = Arc::new(move || -> BoxFuture<'static, Result<RouteModule, LoadError>> {
            let module = module.clone();
            Box::pin(async move { Ok(module) })
        });
        self.modules.insert(relative_path.into(), factory);
        self
    }

    /// Register a module produced asynchronously at load time.
    pub fn register_async<F, Fut>(mut self, relative_path: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RouteModule, LoadError>> + Send + 'static,
    {
        let factory: ModuleFactory =
            Arc::new(move || -> BoxFuture<'static, Result<RouteModule, LoadError>> { Box::pin(factory()) });
        self.modules.insert(relative_path.into(), factory);
        self
    }

    /// Registered paths, sorted; handy as the enumeration result.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.modules.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl std::fmt::Debug for StaticLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticLoader")
            .field("modules", &self.paths())
            .finish()
    }
}

#[async_trait]
impl ModuleLoader for StaticLoader {
    async fn load(&self, _base_dir: &Path, relative_path: &str) -> Result<RouteModule, LoadError> {
        let factory = self
            .modules
            .get(relative_path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(relative_path.to_string()))?;
        factory().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn loads_registered_modules() {
        let loader = StaticLoader::new()
            .register("get.toml", RouteModule::new().with_export("a", json!(1)))
            .register_async("_id/get.toml", || async {
                tokio::task::yield_now().await;
                Ok(RouteModule::new().with_export("b", json!(2)))
            });

        let root = loader.load(Path::new("/"), "get.toml").await.unwrap();
        assert!(root.get("a").is_some());
        let by_id = loader.load(Path::new("/"), "_id/get.toml").await.unwrap();
        assert!(by_id.get("b").is_some());
        assert_eq!(loader.paths(), vec!["_id/get.toml", "get.toml"]);
    }

    #[tokio::test]
    async fn unknown_path_is_a_load_error() {
        let err = StaticLoader::new()
            .load(Path::new("/"), "missing/get.toml")
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[tokio::test]
    async fn async_factory_errors_propagate() {
        let loader = StaticLoader::new().register_async("get.toml", || async {
            Err(LoadError::Invalid {
                path: "get.toml".into(),
                message: "broken".into(),
            })
        });
        assert!(loader.load(Path::new("/"), "get.toml").await.is_err());
    }
}
