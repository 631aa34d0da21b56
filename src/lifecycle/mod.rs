//! Process lifecycle: startup wiring, signals and graceful shutdown.
//!
//! # Data Flow
//! ```text
//! Application::build (startup.rs)
//!     config → metrics exporter → DirRouter (route build spawned)
//!     → bind listener → HttpServer
//!
//! SIGINT / SIGTERM (signals.rs) → Shutdown::trigger (shutdown.rs)
//!     → server stops accepting, in-flight responses finish
//! ```
//!
//! # Design Decisions
//! - The listener accepts before the route table exists; the gate covers the gap
//! - One broadcast channel fans the shutdown out to every subscriber

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{Application, StartupError};
