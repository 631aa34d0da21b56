//! Route directory server library.
//!
//! Builds an HTTP route table from a directory of route modules and serves
//! traffic correctly while that table is still being built.
//!
//! ```text
//!  routes/                        ┌──────────────────────────────────────┐
//!    middleware.toml  ─┐          │ Stack (engine)                       │
//!    get.toml          │ build    │  [0] initialization gate  (removed   │
//!    _id/get.toml      ├────────▶ │      once built and drained)         │
//!    books/get.toml    │ task     │  [1] use  /books                     │
//!    books/post.toml  ─┘          │  [2] GET  /books   ...               │
//!                                 └──────────────────────────────────────┘
//! ```

// Route table builder
pub mod builder;
pub mod discovery;
pub mod module;
pub mod routing;

// Serving chain
pub mod engine;
pub mod init;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use builder::{build_routes, DirRouter, RouterOptions};
pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
