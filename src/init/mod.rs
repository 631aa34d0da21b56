//! Serving traffic while the route table is still being built.
//!
//! # Data Flow
//! ```text
//! build task ──InitCompleter──▶ signal.rs (Pending → Succeeded | Failed)
//!                                   │
//! request ──▶ gate.rs (admit → wait on signal → release forward)
//!                 │
//!                 └─ response body finished/dropped → ticket removed
//!                    → signal terminal + nothing pending → gate removes itself
//! ```

pub mod gate;
pub mod signal;

pub use gate::{GatePhase, InitGate};
pub use signal::{channel, InitCompleter, InitOutcome, InitSignal, InitState};
