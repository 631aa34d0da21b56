//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use routedir::config::ServerConfig;
use routedir::init::GatePhase;
use routedir::lifecycle::{Application, Shutdown};
use routedir::DirRouter;
use tokio::task::JoinHandle;

/// Write route files under `root`, creating directories as needed.
pub fn write_routes(root: &Path, files: &[(&str, &str)]) {
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

/// Config serving `route_dir` on an ephemeral local port.
pub fn test_config(route_dir: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.routes.absolute_path = Some(route_dir.to_string_lossy().into_owned());
    config
}

/// A running server.
pub struct TestServer {
    pub addr: SocketAddr,
    pub routes: DirRouter,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

/// Build and start the application in the background.
pub async fn start_server(config: ServerConfig, cwd: &Path) -> TestServer {
    let app = Application::build(config, cwd).await.unwrap();
    let addr = app.local_addr().unwrap();
    let routes = app.routes().clone();
    let shutdown = app.shutdown();
    let handle = tokio::spawn(async move {
        app.run().await.unwrap();
    });
    TestServer {
        addr,
        routes,
        shutdown,
        handle,
    }
}

/// Poll until the router's gate has removed itself.
pub async fn wait_for_retirement(routes: &DirRouter) {
    for _ in 0..400 {
        if routes.gate_phase() == GatePhase::Retired {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("gate did not retire, phase {:?}", routes.gate_phase());
}

pub async fn get_text(client: &reqwest::Client, url: &str) -> (u16, String) {
    let response = client.get(url).send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}
