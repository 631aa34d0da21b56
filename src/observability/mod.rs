//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! builder / binder  → "Applying route ..." events, routes_registered counter
//! init gate         → admitted counter, pending gauge, retirement counter
//! http server       → per-request span (request id), request histogram
//!     → logging.rs (pretty or JSON on stdout, RUST_LOG aware)
//!     → metrics.rs (Prometheus exporter, only when enabled)
//! ```
//!
//! # Design Decisions
//! - Metric calls are no-ops until an exporter is installed
//! - Registration logs go to INFO only in debug mode

pub mod logging;
pub mod metrics;
