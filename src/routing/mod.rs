//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     relative file paths
//!     → classify.rs (file stem → method, directories → route path)
//!     → table.rs (sort into registration order)
//!     → OrderedRouteTable (immutable)
//!
//! Incoming Request (method, path):
//!     → engine walks registered layers in order
//!     → matcher.rs (exact or prefix match, capture params)
//! ```
//!
//! # Design Decisions
//! - Table computed once, immutable afterwards
//! - Registration order is match order, so precedence lives in the sort
//! - No regex in the hot path (segment comparison only)

pub mod classify;
pub mod matcher;
pub mod method;
pub mod table;

pub use classify::classify;
pub use matcher::{PathParams, PathPattern};
pub use method::RouteMethod;
pub use table::{sort_entries, OrderedRouteTable, RouteEntry};
