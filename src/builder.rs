//! Route directory router: builds the route table in the background while
//! the initialization gate holds early traffic.
//!
//! # Data Flow
//! ```text
//! DirRouter::new
//!     → engine + gate (front of the chain, armed)
//!     → spawn build task:
//!         FilePattern → RouteLister::list → OrderedRouteTable::from_paths
//!         → resolve_modules → apply_route_table
//!         → InitCompleter::succeed | fail
//!     → return immediately
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use crate::discovery::{FilePattern, RouteLister};
use crate::engine::{RouteRegistry, Stack, StackService};
use crate::error::BuildError;
use crate::init::{self, GatePhase, InitGate, InitOutcome, InitSignal};
use crate::module::{apply_route_table, resolve_modules, ModuleLoader};
use crate::routing::OrderedRouteTable;

/// Resolved options for one router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterOptions {
    /// Directory the route files live in, already absolute.
    pub route_dir: PathBuf,
    /// File extensions to consider, without the leading dot.
    pub extensions: Vec<String>,
    /// Log every registration at INFO instead of DEBUG.
    pub debug: bool,
}

/// Router built from a directory of route modules.
#[derive(Debug, Clone)]
pub struct DirRouter {
    engine: Arc<Stack>,
    gate: InitGate,
    signal: InitSignal,
    options: Arc<RouterOptions>,
}

impl DirRouter {
    /// Create a router over a fresh engine and start building it.
    ///
    /// Returns immediately; requests served before the build finishes are
    /// held by the initialization gate. Must be called within a Tokio runtime.
    pub fn new<Li, Lo>(options: RouterOptions, lister: Li, loader: Lo) -> Self
    where
        Li: RouteLister + 'static,
        Lo: ModuleLoader + 'static,
    {
        Self::with_engine(Arc::new(Stack::new()), options, lister, loader)
    }

    /// Same as [`DirRouter::new`], registering into a caller-provided engine.
    /// Layers already on the engine stay behind the gate.
    pub fn with_engine<Li, Lo>(engine: Arc<Stack>, options: RouterOptions, lister: Li, loader: Lo) -> Self
    where
        Li: RouteLister + 'static,
        Lo: ModuleLoader + 'static,
    {
        let registry: Arc<dyn RouteRegistry> = engine.clone();
        let (completer, signal) = init::channel();
        let gate = InitGate::install(&registry, signal.clone());
        let options = Arc::new(options);

        tracing::info!(
            route_dir = %options.route_dir.display(),
            extensions = ?options.extensions,
            "Building routes"
        );

        tokio::spawn({
            let options = options.clone();
            async move {
                match build_routes(registry.as_ref(), &options, &lister, &loader).await {
                    Ok(registered) => {
                        tracing::info!(registered, "Route table ready");
                        completer.succeed();
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Route table build failed");
                        completer.fail(e);
                    }
                }
            }
        });

        Self {
            engine,
            gate,
            signal,
            options,
        }
    }

    /// Wait for the build to finish. Can be awaited any number of times.
    pub async fn ready(&self) -> InitOutcome {
        self.signal.wait().await
    }

    pub fn signal(&self) -> &InitSignal {
        &self.signal
    }

    pub fn service(&self) -> StackService {
        self.engine.service()
    }

    pub fn engine(&self) -> &Arc<Stack> {
        &self.engine
    }

    pub fn gate(&self) -> &InitGate {
        &self.gate
    }

    pub fn gate_phase(&self) -> GatePhase {
        self.gate.phase()
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }
}

/// Enumerate, classify, sort, load and register every route module.
/// Returns the number of registered layers.
pub async fn build_routes<Li, Lo>(
    registry: &dyn RouteRegistry,
    options: &RouterOptions,
    lister: &Li,
    loader: &Lo,
) -> Result<usize, BuildError>
where
    Li: RouteLister + ?Sized,
    Lo: ModuleLoader + ?Sized,
{
    let pattern = FilePattern::for_extensions(options.extensions.as_slice())?;
    let paths = lister.list(&pattern, &options.route_dir).await?;
    let table = OrderedRouteTable::from_paths(&paths);
    tracing::debug!(candidates = paths.len(), routes = table.len(), "Route files classified");

    let modules = resolve_modules(loader, &options.route_dir, &table).await?;
    Ok(apply_route_table(registry, &table, &modules, options.debug))
}
