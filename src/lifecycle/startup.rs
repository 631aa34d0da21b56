//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start the route build and bind the listener right away; the
//!   initialization gate holds traffic until the build is done
//!
//! # Design Decisions
//! - Fail fast: a bind error is fatal
//! - A failed route build is not fatal; requests get the failure until the
//!   gate retires, then the (empty) engine answers

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::builder::DirRouter;
use crate::config::{resolve_router_options, ServerConfig};
use crate::discovery::WalkDirLister;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_listener;
use crate::module::TomlLoader;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// A router and its server, bound and ready to run.
pub struct Application {
    routes: DirRouter,
    server: HttpServer,
    listener: TcpListener,
    shutdown: Shutdown,
}

impl Application {
    /// Start the route build, bind the listener and wire the server.
    pub async fn build(config: ServerConfig, cwd: &Path) -> Result<Self, StartupError> {
        if config.observability.metrics_enabled {
            match config.observability.metrics_address.parse::<SocketAddr>() {
                Ok(addr) => metrics::init_metrics(addr),
                Err(_) => tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                ),
            }
        }

        let options = resolve_router_options(&config.routes, cwd);
        let routes = DirRouter::new(options, WalkDirLister::new(), TomlLoader::new());

        let listener = TcpListener::bind(&config.listener.bind_address)
            .await
            .map_err(|source| StartupError::Bind {
                address: config.listener.bind_address.clone(),
                source,
            })?;
        tracing::info!(address = %listener.local_addr()?, "Listening for connections");

        let server = HttpServer::new(config, &routes);
        Ok(Self {
            routes,
            server,
            listener,
            shutdown: Shutdown::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    pub fn routes(&self) -> &DirRouter {
        &self.routes
    }

    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Serve until the shutdown coordinator fires.
    pub async fn run(self) -> Result<(), StartupError> {
        let receiver = self.shutdown.subscribe();
        self.server.run(self.listener, receiver).await?;
        Ok(())
    }

    /// Serve until SIGINT/SIGTERM.
    pub async fn run_until_signalled(self) -> Result<(), StartupError> {
        let listener = spawn_signal_listener(self.shutdown.clone());
        let result = self.run().await;
        listener.abort();
        result
    }
}
