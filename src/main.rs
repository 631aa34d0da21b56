//! routedir: serve a directory of route modules over HTTP.
//!
//! ```text
//! routedir --routes ./routes --bind 127.0.0.1:8080 --debug
//! ```

use std::path::PathBuf;

use clap::Parser;

use routedir::config::{load_config, validate_config, ConfigError, ServerConfig};
use routedir::lifecycle::Application;
use routedir::observability::logging;

/// Serve HTTP routes discovered from a directory of route modules.
#[derive(Debug, Parser)]
#[command(name = "routedir", version, about)]
struct Cli {
    /// Configuration file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Route directory; absolute paths are used as-is.
    #[arg(short, long)]
    routes: Option<String>,

    /// Bind address, e.g. 127.0.0.1:8080.
    #[arg(short, long)]
    bind: Option<String>,

    /// Route file extension to consider (repeatable).
    #[arg(long = "ext")]
    extensions: Vec<String>,

    /// Log every route registration.
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn apply(self, mut config: ServerConfig) -> Result<ServerConfig, ConfigError> {
        if let Some(routes) = self.routes {
            if PathBuf::from(&routes).is_absolute() {
                config.routes.absolute_path = Some(routes);
            } else {
                config.routes.absolute_path = None;
                config.routes.route_dir = Some(routes);
            }
        }
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if !self.extensions.is_empty() {
            config.routes.extensions = Some(self.extensions);
        }
        if self.debug {
            config.routes.debug = true;
        }
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    let config = cli.apply(config)?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "routedir starting");

    let cwd = std::env::current_dir()?;
    let app = Application::build(config, &cwd).await?;
    app.run_until_signalled().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
