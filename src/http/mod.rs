//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span, timeout)
//!     → DirRouter engine (fallback service)
//!         → initialization gate while routes are being built
//!         → route directory layers
//!     → Send to client
//! ```

pub mod server;

pub use server::{HttpServer, X_REQUEST_ID};
