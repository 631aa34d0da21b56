//! Sequential module resolution.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LoadError;
use crate::module::RouteModule;
use crate::routing::OrderedRouteTable;

/// Loads one route module.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Load the module at `relative_path` under `base_dir`.
    async fn load(&self, base_dir: &Path, relative_path: &str) -> Result<RouteModule, LoadError>;
}

#[async_trait]
impl<L: ModuleLoader + ?Sized> ModuleLoader for Arc<L> {
    async fn load(&self, base_dir: &Path, relative_path: &str) -> Result<RouteModule, LoadError> {
        (**self).load(base_dir, relative_path).await
    }
}

/// Load one module per table entry, in table order.
///
/// Each load starts only after the previous one has finished, so module
/// initialisation order is deterministic. The first failure aborts the whole
/// resolution; no partial result is returned.
pub async fn resolve_modules<L>(
    loader: &L,
    base_dir: &Path,
    table: &OrderedRouteTable,
) -> Result<Vec<RouteModule>, LoadError>
where
    L: ModuleLoader + ?Sized,
{
    let mut modules = Vec::with_capacity(table.len());
    for relative_path in table.source_paths() {
        tracing::trace!(path = %relative_path, "Loading route module");
        let module = loader.load(base_dir, relative_path).await?;
        modules.push(module);
    }
    Ok(modules)
}
